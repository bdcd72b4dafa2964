//! Process fixtures for integration tests that drive external daemons.
//!
//! The `aviary-harness` crate owns the generic half of a daemon fixture:
//! a private temporary configuration directory, the daemon's command-line
//! arguments, a typed configuration slot, deferred file writes and admin
//! commands, ephemeral listener acquisition, self-signed certificates and
//! the launch/teardown lifecycle. Daemon-specific crates (such as
//! `aviary-prosody`) supply the configuration type and the option
//! combinators that mutate it.
//!
//! A fixture is composed single-threaded, in caller order, and launched
//! once. Errors abort composition immediately; nothing is rolled back
//! because every mutation is confined to in-memory state and the fixture's
//! own temp directory, which is removed when the fixture drops.
//!
//! ```rust,no_run
//! use aviary_harness::Fixture;
//!
//! # fn main() -> Result<(), aviary_harness::FixtureError> {
//! let mut fixture = Fixture::<()>::new("mydaemon")?;
//! fixture.args(["--foreground"]);
//! let daemon = fixture.start()?;
//! // ... exercise the daemon ...
//! daemon.stop()?;
//! # Ok(()) }
//! ```

mod cert;
mod error;
mod fixture;
mod jid;
mod spawning;

pub use error::FixtureError;
pub use fixture::{ConnectionClass, Fixture, FixtureOption, Identity};
pub use jid::{Jid, JidError};
pub use spawning::Daemon;
