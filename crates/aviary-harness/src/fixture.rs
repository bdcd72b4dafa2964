//! Generic builder for external-daemon test fixtures.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::mem;
use std::net::TcpListener;
use std::process::Command;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::FixtureError;
use crate::jid::Jid;
use crate::spawning::{self, Daemon};

/// An option combinator: a one-shot mutation applied to a shared fixture
/// builder, failing on any irrecoverable condition.
///
/// Options compose in caller order; the first failure aborts the whole
/// application sequence.
pub type FixtureOption<C> = Box<dyn FnOnce(&mut Fixture<C>) -> Result<(), FixtureError>>;

type FileRenderer<C> = Box<dyn Fn(&Fixture<C>) -> Result<String, FixtureError>>;

/// Connection classes a daemon fixture can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionClass {
    /// Client-to-server connections.
    ClientToServer,
    /// Server-to-server connections.
    ServerToServer,
}

impl fmt::Display for ConnectionClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToServer => formatter.write_str("c2s"),
            Self::ServerToServer => formatter.write_str("s2s"),
        }
    }
}

/// The fixture's default authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    jid: Jid,
    password: String,
}

impl Identity {
    /// Pairs an address with its password.
    #[must_use]
    pub fn new(jid: Jid, password: impl Into<String>) -> Self {
        Self {
            jid,
            password: password.into(),
        }
    }

    /// The identity's address.
    #[must_use]
    pub const fn jid(&self) -> &Jid {
        &self.jid
    }

    /// The identity's password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

struct PendingFile<C> {
    name: String,
    renderer: FileRenderer<C>,
}

struct DeferredCommand {
    command: Command,
    timeout: Duration,
}

/// Builder for one configured, launchable daemon instance.
///
/// Each fixture owns a private temporary config directory, the daemon's
/// command-line arguments and a typed configuration value `C`. The value
/// is created at its default and mutated monotonically by option
/// combinators until the fixture is started; it is never shared between
/// two launches. Dropping the fixture (or the [`Daemon`] handle holding
/// it) removes the directory and everything rendered into it.
pub struct Fixture<C> {
    program: OsString,
    args: Vec<OsString>,
    config: C,
    identity: Option<Identity>,
    pending_files: Vec<PendingFile<C>>,
    deferred: Vec<DeferredCommand>,
    config_dir: Utf8PathBuf,
    // Held for its Drop: releasing the handle deletes the directory tree.
    _temp_dir: TempDir,
}

impl<C: fmt::Debug> fmt::Debug for Fixture<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Fixture")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("config_dir", &self.config_dir)
            .finish_non_exhaustive()
    }
}

impl<C: Default> Fixture<C> {
    /// Creates an empty fixture for `program` with a fresh config directory.
    ///
    /// # Errors
    /// Returns an error if the temporary directory cannot be created or its
    /// path is not valid UTF-8.
    pub fn new(program: impl Into<OsString>) -> Result<Self, FixtureError> {
        let temp_dir =
            TempDir::new().map_err(|source| FixtureError::CreateConfigDir { source })?;
        let config_dir = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .map_err(|path| FixtureError::NonUtf8ConfigDir { path })?;
        let binary = program.into();
        debug!(program = ?binary, config_dir = %config_dir, "created fixture");
        Ok(Self {
            program: binary,
            args: Vec::new(),
            config: C::default(),
            identity: None,
            pending_files: Vec::new(),
            deferred: Vec::new(),
            config_dir,
            _temp_dir: temp_dir,
        })
    }
}

impl<C> Fixture<C> {
    /// Appends command-line arguments forwarded to the daemon at launch.
    pub fn args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    /// The daemon arguments accumulated so far, in order.
    #[must_use]
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Reports whether `flag` already appears among the daemon arguments.
    #[must_use]
    pub fn has_arg(&self, flag: impl AsRef<OsStr>) -> bool {
        let wanted = flag.as_ref();
        self.args.iter().any(|arg| arg == wanted)
    }

    /// The daemon binary this fixture launches.
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// The fixture's private configuration directory.
    #[must_use]
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// The configuration value accumulated so far.
    #[must_use]
    pub const fn config(&self) -> &C {
        &self.config
    }

    /// Replaces the configuration value wholesale.
    ///
    /// Combinators read the current value with [`Fixture::config`], mutate a
    /// copy and store it back here rather than mutating in place.
    pub fn set_config(&mut self, config: C) {
        self.config = config;
    }

    /// The default authenticated identity, when one has been recorded.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Records the fixture's default authenticated identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Renders `renderer` against the current fixture state and writes the
    /// result under `name` in the config directory, returning the path.
    ///
    /// # Errors
    /// Propagates renderer failures and filesystem write failures.
    pub fn render_file(
        &self,
        name: &str,
        renderer: impl Fn(&Self) -> Result<String, FixtureError>,
    ) -> Result<Utf8PathBuf, FixtureError> {
        let contents = renderer(self)?;
        let path = self.config_dir.join(name);
        fs::write(&path, contents).map_err(|source| FixtureError::WriteFile {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path, "rendered fixture file");
        Ok(path)
    }

    /// Registers a file to be rendered into the config directory when the
    /// fixture starts.
    pub fn defer_file(
        &mut self,
        name: impl Into<String>,
        renderer: impl Fn(&Self) -> Result<String, FixtureError> + 'static,
    ) {
        self.pending_files.push(PendingFile {
            name: name.into(),
            renderer: Box::new(renderer),
        });
    }

    /// Renders every file registered with [`Fixture::defer_file`], draining
    /// the registry.
    ///
    /// Called automatically by [`Fixture::start`]; exposed so tests can
    /// flush pending files without launching the daemon.
    ///
    /// # Errors
    /// Propagates the first renderer or write failure.
    pub fn render_pending_files(&mut self) -> Result<(), FixtureError> {
        let pending = mem::take(&mut self.pending_files);
        for file in &pending {
            self.render_file(&file.name, &file.renderer)?;
        }
        Ok(())
    }

    /// Queues an admin command to run synchronously when the fixture starts.
    ///
    /// The command inherits this process's stdio and is awaited for at most
    /// `timeout` before being killed.
    pub fn defer_command(&mut self, command: Command, timeout: Duration) {
        self.deferred.push(DeferredCommand { command, timeout });
    }

    /// The admin commands queued so far, in registration order.
    pub fn deferred_commands(&self) -> impl Iterator<Item = &Command> {
        self.deferred.iter().map(|deferred| &deferred.command)
    }

    /// Runs every queued admin command in registration order, draining the
    /// queue.
    ///
    /// Called automatically by [`Fixture::start`]; exposed so tests can
    /// drive the queue without launching the daemon.
    ///
    /// # Errors
    /// Propagates launch failures, non-zero exits and expired deadlines of
    /// the first failing command.
    pub fn run_deferred(&mut self) -> Result<(), FixtureError> {
        let deferred = mem::take(&mut self.deferred);
        for DeferredCommand {
            mut command,
            timeout,
        } in deferred
        {
            spawning::run_to_completion(&mut command, timeout)?;
        }
        Ok(())
    }

    /// Opens an ephemeral TCP listener on the IPv6 loopback for `class`.
    ///
    /// The caller owns the listener; dropping it releases the port so the
    /// daemon can bind it itself at startup. Nothing stops another process
    /// claiming the port in between. That race is accepted for test
    /// fixtures rather than coordinated away.
    ///
    /// # Errors
    /// Returns an error if the listener cannot be bound.
    pub fn listen(&self, class: ConnectionClass) -> Result<TcpListener, FixtureError> {
        let listener = TcpListener::bind(("::1", 0))
            .map_err(|source| FixtureError::ReservePort { class, source })?;
        if let Ok(addr) = listener.local_addr() {
            debug!(%class, port = addr.port(), "opened ephemeral listener");
        }
        Ok(listener)
    }

    /// Issues a self-signed certificate for `hostname` under `certs/` in
    /// the config directory.
    ///
    /// # Errors
    /// Propagates certificate generation and write failures.
    pub fn issue_self_signed_cert(&self, hostname: &str) -> Result<(), FixtureError> {
        crate::cert::write_self_signed(&self.config_dir.join("certs"), hostname)
    }

    /// Renders pending files, runs queued admin commands and launches the
    /// daemon with inherited stdio.
    ///
    /// # Errors
    /// Propagates render, admin-command and spawn failures. On failure the
    /// fixture is consumed and its config directory removed.
    pub fn start(mut self) -> Result<Daemon<C>, FixtureError> {
        self.render_pending_files()?;
        self.run_deferred()?;
        let child = spawning::spawn_daemon(&self.program, &self.args)?;
        Ok(Daemon::new(self, child))
    }
}
