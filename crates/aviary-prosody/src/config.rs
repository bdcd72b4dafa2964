//! The structured Prosody configuration and its Lua renderer.

use std::fmt::{self, Write};

use camino::Utf8Path;
use thiserror::Error;

/// Modules every rendered configuration enables before custom additions.
const BASELINE_MODULES: [&str; 8] = [
    "roster",
    "saslauth",
    "tls",
    "dialback",
    "disco",
    "ping",
    "time",
    "version",
];

/// Errors raised while rendering a configuration to Lua.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Rendering requires at least one virtual host.
    #[error("cannot render a Prosody configuration with no virtual hosts")]
    NoVhosts,

    /// Formatting into the output buffer failed.
    #[error(transparent)]
    Format(#[from] fmt::Error),
}

/// Desired state for one Prosody instance.
///
/// The value accumulates across option combinators and is rendered to
/// `prosody.cfg.lua` once the fixture is assembled. It belongs to exactly
/// one fixture and is never reused across launches. The config directory
/// is not part of the value; the fixture owns it and supplies it to
/// [`Config::render`] as read-only context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Virtual hosts in declaration order. Must be non-empty by render
    /// time.
    pub vhosts: Vec<String>,

    /// Client-to-server port. `None` leaves the choice to the daemon.
    pub c2s_port: Option<u16>,

    /// Server-to-server port. `None` leaves the choice to the daemon.
    pub s2s_port: Option<u16>,

    /// Extra modules to enable, in declaration order. Duplicates are kept;
    /// the daemon tolerates them and deterministic output matters more
    /// here than a tidy list.
    pub modules: Vec<String>,
}

impl Config {
    /// Renders the value as Prosody's native `cfg.lua`, rooting every
    /// path (pid file, data directory, plugins, certificates) at
    /// `config_dir`.
    ///
    /// # Errors
    /// Fails when no virtual host has been configured.
    pub fn render(&self, config_dir: &Utf8Path) -> Result<String, RenderError> {
        if self.vhosts.is_empty() {
            return Err(RenderError::NoVhosts);
        }

        let mut out = String::new();
        writeln!(out, "daemonize = false")?;
        writeln!(out, "pidfile = \"{config_dir}/prosody.pid\"")?;
        writeln!(out, "data_path = \"{config_dir}/data\"")?;
        writeln!(out, "plugin_paths = {{ \"{config_dir}\" }}")?;
        writeln!(out, "interfaces = {{ \"::1\" }}")?;
        writeln!(out, "admins = {{ }}")?;
        writeln!(out, "certificates = \"{config_dir}/certs\"")?;
        if let Some(port) = self.c2s_port {
            writeln!(out, "c2s_ports = {{ {port} }}")?;
        }
        if let Some(port) = self.s2s_port {
            writeln!(out, "s2s_ports = {{ {port} }}")?;
        }
        writeln!(out, "c2s_require_encryption = false")?;
        writeln!(out, "s2s_require_encryption = false")?;
        writeln!(out, "allow_unencrypted_plain_auth = true")?;
        writeln!(out, "modules_enabled = {{")?;
        for module in BASELINE_MODULES {
            writeln!(out, "  \"{module}\";")?;
        }
        for module in &self.modules {
            writeln!(out, "  \"{module}\";")?;
        }
        writeln!(out, "}}")?;
        for vhost in &self.vhosts {
            writeln!(out)?;
            writeln!(out, "VirtualHost \"{vhost}\"")?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::{Config, RenderError};

    const CONFIG_DIR: &str = "/tmp/fixture";

    fn base_config() -> Config {
        Config {
            vhosts: vec!["localhost".to_owned()],
            ..Config::default()
        }
    }

    fn render(config: &Config) -> String {
        config
            .render(Utf8Path::new(CONFIG_DIR))
            .expect("render config")
    }

    #[test]
    fn render_requires_a_vhost() {
        let error = Config::default()
            .render(Utf8Path::new(CONFIG_DIR))
            .expect_err("must refuse an empty vhost list");
        assert!(matches!(error, RenderError::NoVhosts));
    }

    #[test]
    fn unset_ports_are_left_to_the_daemon() {
        let rendered = render(&base_config());
        assert!(!rendered.contains("c2s_ports"));
        assert!(!rendered.contains("s2s_ports"));
    }

    #[test]
    fn reserved_ports_are_rendered() {
        let config = Config {
            c2s_port: Some(5222),
            s2s_port: Some(5269),
            ..base_config()
        };
        let rendered = render(&config);
        assert!(rendered.contains("c2s_ports = { 5222 }"));
        assert!(rendered.contains("s2s_ports = { 5269 }"));
    }

    #[test]
    fn custom_modules_follow_the_baseline_in_order() {
        let config = Config {
            modules: vec!["trustall".to_owned(), "pep".to_owned(), "trustall".to_owned()],
            ..base_config()
        };
        let rendered = render(&config);

        let baseline = rendered.find("\"roster\";").expect("baseline module");
        let first_custom = rendered.find("\"trustall\";").expect("custom module");
        let second_custom = rendered.find("\"pep\";").expect("second custom module");
        assert!(baseline < first_custom);
        assert!(first_custom < second_custom);
        assert_eq!(
            rendered.matches("\"trustall\";").count(),
            2,
            "duplicates are preserved"
        );
    }

    #[test]
    fn vhost_blocks_preserve_declaration_order() {
        let config = Config {
            vhosts: vec!["first.example".to_owned(), "second.example".to_owned()],
            ..Config::default()
        };
        let rendered = render(&config);

        let first = rendered
            .find("VirtualHost \"first.example\"")
            .expect("first vhost");
        let second = rendered
            .find("VirtualHost \"second.example\"")
            .expect("second vhost");
        assert!(first < second);
    }

    #[test]
    fn paths_are_rooted_at_the_config_dir() {
        let rendered = render(&base_config());
        assert!(rendered.contains("pidfile = \"/tmp/fixture/prosody.pid\""));
        assert!(rendered.contains("certificates = \"/tmp/fixture/certs\""));
        assert!(rendered.contains("plugin_paths = { \"/tmp/fixture\" }"));
    }
}
