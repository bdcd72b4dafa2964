//! Error surface shared by fixture builders and option combinators.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::fixture::ConnectionClass;
use crate::jid::JidError;

/// Errors raised while composing or launching a daemon fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture's temporary configuration directory could not be created.
    #[error("failed to create fixture config directory: {source}")]
    CreateConfigDir {
        /// Underlying filesystem failure.
        #[source]
        source: io::Error,
    },

    /// The temporary directory path is not valid UTF-8.
    #[error("fixture config directory {path:?} is not valid UTF-8")]
    NonUtf8ConfigDir {
        /// The offending path.
        path: PathBuf,
    },

    /// An address supplied to a combinator failed to parse.
    #[error(transparent)]
    Address(#[from] JidError),

    /// An ephemeral listener could not be bound or inspected.
    #[error("failed to reserve a {class} listener on [::1]: {source}")]
    ReservePort {
        /// Connection class the listener was requested for.
        class: ConnectionClass,
        /// Underlying socket failure.
        #[source]
        source: io::Error,
    },

    /// A rendered file could not be written into the config directory.
    #[error("failed to write fixture file {path}: {source}")]
    WriteFile {
        /// Destination path of the failed write.
        path: Utf8PathBuf,
        /// Underlying filesystem failure.
        #[source]
        source: io::Error,
    },

    /// A file-render callback failed.
    #[error("failed to render fixture file {name}: {source}")]
    Render {
        /// Name of the file being rendered.
        name: String,
        /// Renderer failure, reported by the configurator crate.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Self-signed certificate issuance failed.
    #[error("failed to issue self-signed certificate for {hostname}: {source}")]
    Certificate {
        /// Hostname the certificate was requested for.
        hostname: String,
        /// Underlying generation failure.
        #[source]
        source: rcgen::Error,
    },

    /// The daemon binary could not be spawned.
    #[error("failed to spawn daemon binary {binary:?}: {source}")]
    LaunchDaemon {
        /// The binary that failed to launch.
        binary: OsString,
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },

    /// An admin command could not be spawned.
    #[error("failed to spawn admin command {program:?}: {source}")]
    LaunchAdmin {
        /// The admin program that failed to launch.
        program: OsString,
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },

    /// An admin command exited with a non-zero status.
    #[error("admin command {program:?} failed with {status}")]
    AdminFailed {
        /// The admin program that failed.
        program: OsString,
        /// The reported exit status.
        status: ExitStatus,
    },

    /// An admin command outlived its deadline and was killed.
    #[error("admin command {program:?} did not exit within {timeout_ms} ms")]
    AdminTimeout {
        /// The admin program that was killed.
        program: OsString,
        /// The deadline that expired, in milliseconds.
        timeout_ms: u64,
    },

    /// Waiting on a child process failed.
    #[error("failed to monitor child process: {source}")]
    MonitorChild {
        /// Underlying wait failure.
        #[source]
        source: io::Error,
    },
}

impl FixtureError {
    /// Wraps a renderer failure for the named fixture file.
    pub fn render(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Render {
            name: name.into(),
            source: source.into(),
        }
    }
}
