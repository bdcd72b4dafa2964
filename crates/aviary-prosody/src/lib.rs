//! Prosody server fixtures for XMPP integration tests.
//!
//! This crate configures and launches the third-party [Prosody] XMPP
//! daemon so integration tests can run real client/server protocol
//! exchanges instead of talking to a mock. It implements no XMPP itself:
//! callers compose a fixture from option combinators, and whatever they
//! leave unspecified is filled in with working defaults immediately
//! before launch: a `localhost` vhost with a self-signed certificate, a
//! `me@localhost` account and a rendered `prosody.cfg.lua`.
//!
//! ```rust,no_run
//! use aviary_prosody as prosody;
//!
//! # fn main() -> Result<(), prosody::FixtureError> {
//! let daemon = prosody::start([prosody::listen_c2s(), prosody::trust_all()])?;
//! let port = daemon.fixture().config().c2s_port;
//! // ... connect a client against `port` ...
//! daemon.stop()?;
//! # Ok(()) }
//! ```
//!
//! Both the `prosody` daemon and its `prosodyctl` admin tool must be
//! discoverable on `PATH`; configuration is entirely programmatic.
//!
//! [Prosody]: https://prosody.im

mod config;
mod defaults;
mod options;

pub use aviary_harness::{Daemon, Fixture, FixtureError, Identity, Jid, JidError};

pub use config::{Config, RenderError};
pub use options::{
    ProsodyOption, config_file, create_user, ctl, listen_c2s, listen_s2s, modules, trust_all,
    vhost,
};

/// File name of the rendered Prosody configuration.
pub const CFG_FILE_NAME: &str = "prosody.cfg.lua";

/// Binary name of the Prosody daemon.
const DAEMON_BIN: &str = "prosody";

/// Binary name of Prosody's admin tool.
const CTL_BIN: &str = "prosodyctl";

/// Flag pointing both binaries at the rendered config file.
const CONFIG_FLAG: &str = "--config";

/// Builds an unstarted Prosody fixture from the given options.
///
/// Options are applied in caller order against one shared builder; the
/// first failure aborts the whole sequence. After every caller option has
/// run, default assembly fills in whatever is still unset and renders the
/// config file. Callers that applied [`config_file`] keep full control
/// and no defaults are injected.
///
/// # Errors
/// Propagates the first combinator or assembly failure.
pub fn new(
    options: impl IntoIterator<Item = ProsodyOption>,
) -> Result<Fixture<Config>, FixtureError> {
    let mut fixture = Fixture::new(DAEMON_BIN)?;
    for option in options {
        option(&mut fixture)?;
    }
    defaults::assemble(&mut fixture)?;
    Ok(fixture)
}

/// Builds a Prosody fixture and launches the daemon.
///
/// Deferred `prosodyctl` invocations (account registration in particular)
/// run synchronously before the daemon process is spawned.
///
/// # Errors
/// Propagates combinator, rendering, admin-tool and spawn failures.
pub fn start(
    options: impl IntoIterator<Item = ProsodyOption>,
) -> Result<Daemon<Config>, FixtureError> {
    new(options)?.start()
}
