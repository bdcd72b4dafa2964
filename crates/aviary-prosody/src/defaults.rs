//! Fallback assembly for fixtures the caller left unconfigured.

use aviary_harness::{Fixture, FixtureError};

use crate::CONFIG_FLAG;
use crate::config::Config;
use crate::options::{config_file, create_user};

/// Hostname served when the caller declared no virtual host.
const DEFAULT_VHOST: &str = "localhost";

/// Localpart of the default account.
const DEFAULT_LOCALPART: &str = "me";

/// Password of the default account.
const DEFAULT_PASSWORD: &str = "password";

/// Fills unset fixture settings with working defaults and renders the
/// config file.
///
/// Runs exactly once, after every caller option, immediately before the
/// fixture can be started. Only fields still at their zero value are
/// touched; caller-supplied settings are never overwritten. A fixture
/// that already carries the `--config` flag is left entirely alone: the
/// caller took control via [`config_file`] and owns vhosts, certificates
/// and accounts.
pub(crate) fn assemble(fixture: &mut Fixture<Config>) -> Result<(), FixtureError> {
    if fixture.has_arg(CONFIG_FLAG) {
        return Ok(());
    }

    let mut config = fixture.config().clone();
    if config.vhosts.is_empty() {
        config.vhosts.push(DEFAULT_VHOST.to_owned());
        fixture.issue_self_signed_cert(DEFAULT_VHOST)?;
        fixture.set_config(config.clone());
    }

    if fixture.identity().is_none()
        && let Some(domain) = config.vhosts.first()
    {
        create_user(format!("{DEFAULT_LOCALPART}@{domain}"), DEFAULT_PASSWORD)(fixture)?;
    }

    config_file(config)(fixture)
}
