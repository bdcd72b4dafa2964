//! Daemon launch, bounded waits and teardown.

use std::ffi::{OsStr, OsString};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::FixtureError;
use crate::fixture::Fixture;

/// Interval between exit polls while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawns the daemon binary with the accumulated arguments and inherited
/// stdio.
pub(crate) fn spawn_daemon(program: &OsStr, args: &[OsString]) -> Result<Child, FixtureError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    info!(program = ?program, ?args, "launching daemon");
    command.spawn().map_err(|source| FixtureError::LaunchDaemon {
        binary: program.to_os_string(),
        source,
    })
}

/// Runs `command` to completion, killing it once `timeout` expires.
///
/// The wait is a synchronous poll loop; callers bound every blocking admin
/// invocation with an explicit deadline instead of relying on ambient
/// cancellation.
pub(crate) fn run_to_completion(
    command: &mut Command,
    timeout: Duration,
) -> Result<(), FixtureError> {
    let program = command.get_program().to_os_string();
    debug!(program = ?program, "running admin command");
    let mut child = command.spawn().map_err(|source| FixtureError::LaunchAdmin {
        program: program.clone(),
        source,
    })?;

    let deadline = Instant::now() + timeout;
    loop {
        let polled = child
            .try_wait()
            .map_err(|source| FixtureError::MonitorChild { source })?;
        match polled {
            Some(status) if status.success() => return Ok(()),
            Some(status) => return Err(FixtureError::AdminFailed { program, status }),
            None if Instant::now() >= deadline => {
                child.kill().ok();
                child.wait().ok();
                return Err(FixtureError::AdminTimeout {
                    program,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    }
}

/// Handle to a launched daemon fixture.
///
/// Holds the fixture (and therefore its config directory) alive for as
/// long as the daemon runs. Dropping the handle kills the daemon
/// best-effort; call [`Daemon::stop`] to observe teardown errors.
#[derive(Debug)]
pub struct Daemon<C> {
    fixture: Fixture<C>,
    child: Child,
}

impl<C> Daemon<C> {
    pub(crate) const fn new(fixture: Fixture<C>, child: Child) -> Self {
        Self { fixture, child }
    }

    /// The fixture that configured this daemon.
    #[must_use]
    pub const fn fixture(&self) -> &Fixture<C> {
        &self.fixture
    }

    /// Operating-system id of the daemon process.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Kills the daemon and reaps it.
    ///
    /// The config directory is removed when the handle drops.
    ///
    /// # Errors
    /// Returns an error if the process cannot be signalled or reaped.
    pub fn stop(mut self) -> Result<(), FixtureError> {
        info!(pid = self.child.id(), "stopping daemon");
        self.child
            .kill()
            .map_err(|source| FixtureError::MonitorChild { source })?;
        let _status = self
            .child
            .wait()
            .map_err(|source| FixtureError::MonitorChild { source })?;
        Ok(())
    }
}

impl<C> Drop for Daemon<C> {
    fn drop(&mut self) {
        // Best-effort teardown; stop() reports errors for callers that care.
        self.child.kill().ok();
        self.child.wait().ok();
    }
}
