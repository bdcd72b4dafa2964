//! Option combinators for composing a Prosody fixture.
//!
//! Each combinator returns a boxed one-shot closure applied, in caller
//! order, to the shared fixture builder. Structured options read the
//! current configuration value, mutate a copy and store it back;
//! [`config_file`] is the one eager exception and renders immediately.

use std::ffi::OsString;
use std::process::Command;
use std::time::Duration;

use aviary_harness::{
    ConnectionClass, Fixture, FixtureError, FixtureOption, Identity, Jid, JidError,
};

use crate::config::Config;
use crate::{CFG_FILE_NAME, CONFIG_FLAG, CTL_BIN};

/// An option combinator specialised to Prosody fixtures.
pub type ProsodyOption = FixtureOption<Config>;

/// How long a deferred `prosodyctl` invocation may run before it is
/// killed.
const CTL_TIMEOUT: Duration = Duration::from_secs(30);

/// Module name enabled by [`trust_all`].
const TRUST_ALL_MODULE: &str = "trustall";

/// Server-side script installed by [`trust_all`]. Static content: the
/// module marks every certificate presented on an s2s connection as
/// valid.
const TRUST_ALL_SCRIPT: &str = r#"module:set_global();

module:hook("s2s-check-certificate", function(event)
	local session = event.session;
	module:log("info", "implicitly trusting presented certificate");
	session.cert_chain_status = "valid";
	session.cert_identity_status = "valid";
	return true;
end);
"#;

/// Writes a complete config file rendered from `config` and points the
/// daemon at it.
///
/// This is the one eager combinator: the file reflects `config` at the
/// moment the option is applied, and because it appends the `--config`
/// flag, default assembly becomes a no-op. Later structured options still
/// mutate the in-memory value (it stays inspectable) but no longer affect
/// the rendered file. Intended for the rare test that needs complete
/// control over the configuration.
pub fn config_file(config: Config) -> ProsodyOption {
    Box::new(move |fixture| {
        fixture.set_config(config);
        let path = fixture.render_file(CFG_FILE_NAME, |current| {
            current
                .config()
                .render(current.config_dir())
                .map_err(|source| FixtureError::render(CFG_FILE_NAME, source))
        })?;
        fixture.args([OsString::from(CONFIG_FLAG), path.into_string().into()]);
        Ok(())
    })
}

/// Defers a `prosodyctl` invocation until the fixture starts.
///
/// The admin tool is pointed at the rendered config file automatically,
/// so callers supply only the subcommand and its arguments. The
/// invocation runs synchronously with inherited stdio; a launch failure,
/// non-zero exit or expired deadline aborts the fixture launch verbatim.
pub fn ctl<I, S>(args: I) -> ProsodyOption
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let arguments: Vec<OsString> = args.into_iter().map(Into::into).collect();
    Box::new(move |fixture| {
        let mut command = Command::new(CTL_BIN);
        command
            .arg(CONFIG_FLAG)
            .arg(fixture.config_dir().join(CFG_FILE_NAME))
            .args(arguments);
        fixture.defer_command(command, CTL_TIMEOUT);
        Ok(())
    })
}

/// Reserves an ephemeral client-to-server port and records it in the
/// configuration.
///
/// Prosody opens its own sockets and cannot adopt an already-bound
/// listener, so the listener here exists only to learn a free port
/// number and is closed straight away; the daemon binds the recorded
/// port itself at startup. Nothing stops another process claiming the
/// port in between; that race is accepted for test fixtures.
pub fn listen_c2s() -> ProsodyOption {
    Box::new(|fixture| {
        let port = reserve_port(fixture, ConnectionClass::ClientToServer)?;
        let mut config = fixture.config().clone();
        config.c2s_port = Some(port);
        fixture.set_config(config);
        Ok(())
    })
}

/// Reserves an ephemeral server-to-server port and records it in the
/// configuration.
///
/// Subject to the same accepted release-to-bind race as [`listen_c2s`].
pub fn listen_s2s() -> ProsodyOption {
    Box::new(|fixture| {
        let port = reserve_port(fixture, ConnectionClass::ServerToServer)?;
        let mut config = fixture.config().clone();
        config.s2s_port = Some(port);
        fixture.set_config(config);
        Ok(())
    })
}

/// Binds `[::1]:0`, reads back the assigned port and releases the socket.
fn reserve_port(
    fixture: &Fixture<Config>,
    class: ConnectionClass,
) -> Result<u16, FixtureError> {
    let listener = fixture.listen(class)?;
    let port = listener
        .local_addr()
        .map_err(|source| FixtureError::ReservePort { class, source })?
        .port();
    drop(listener);
    Ok(port)
}

/// Declares one or more virtual hosts, appended in call order.
///
/// When no vhost is configured at assembly time, a single `localhost`
/// vhost is created together with a self-signed certificate. Callers
/// using this option must provide certificates themselves.
pub fn vhost<I, S>(hosts: I) -> ProsodyOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let hostnames: Vec<String> = hosts.into_iter().map(Into::into).collect();
    Box::new(move |fixture| {
        let mut config = fixture.config().clone();
        config.vhosts.extend(hostnames);
        fixture.set_config(config);
        Ok(())
    })
}

/// Enables extra modules, appended in call order without de-duplication.
pub fn modules<I, S>(names: I) -> ProsodyOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let additions: Vec<String> = names.into_iter().map(Into::into).collect();
    Box::new(move |fixture| {
        let mut config = fixture.config().clone();
        config.modules.extend(additions);
        fixture.set_config(config);
        Ok(())
    })
}

/// Registers an account via `prosodyctl` and records it as the fixture's
/// default identity.
///
/// Equivalent to `ctl(["register", localpart, domainpart, password])`
/// except that the parsed identity is also stored on the fixture.
/// Malformed addresses fail when the option is applied, before anything
/// is queued or any OS resource is touched.
pub fn create_user(address: impl Into<String>, password: impl Into<String>) -> ProsodyOption {
    let parsed: Result<Jid, JidError> = address.into().parse();
    let secret: String = password.into();
    Box::new(move |fixture| {
        let jid = parsed?;
        ctl([
            "register",
            jid.localpart(),
            jid.domainpart(),
            secret.as_str(),
        ])(fixture)?;
        fixture.set_identity(Identity::new(jid, secret));
        Ok(())
    })
}

/// Configures the server to trust every certificate presented to it,
/// without verification.
///
/// Enables the `trustall` module and registers its implementation for
/// installation into the config directory when the fixture starts.
pub fn trust_all() -> ProsodyOption {
    Box::new(|fixture| {
        modules([TRUST_ALL_MODULE])(fixture)?;
        fixture.defer_file(
            format!("mod_{TRUST_ALL_MODULE}.lua"),
            |_fixture: &Fixture<Config>| Ok(TRUST_ALL_SCRIPT.to_owned()),
        );
        Ok(())
    })
}
