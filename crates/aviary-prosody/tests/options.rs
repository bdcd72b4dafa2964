//! Behavioural tests for the option combinators.

use std::fs;

use aviary_prosody::{
    self as prosody, Config, Fixture, FixtureError, JidError, ProsodyOption,
};
use rstest::rstest;

fn unassembled() -> Fixture<Config> {
    Fixture::new("prosody").expect("create fixture")
}

fn apply(options: impl IntoIterator<Item = ProsodyOption>) -> Fixture<Config> {
    let mut fixture = unassembled();
    for option in options {
        option(&mut fixture).expect("apply option");
    }
    fixture
}

#[test]
fn vhosts_and_modules_concatenate_in_call_order() {
    let fixture = apply([
        prosody::vhost(["a.example"]),
        prosody::modules(["one"]),
        prosody::vhost(["b.example", "c.example"]),
        prosody::modules(["two", "one"]),
    ]);

    assert_eq!(
        fixture.config().vhosts,
        ["a.example", "b.example", "c.example"]
    );
    assert_eq!(fixture.config().modules, ["one", "two", "one"]);
}

#[rstest]
#[case::c2s(prosody::listen_c2s(), true)]
#[case::s2s(prosody::listen_s2s(), false)]
fn listen_options_record_only_their_class(#[case] option: ProsodyOption, #[case] is_c2s: bool) {
    let mut fixture = unassembled();
    option(&mut fixture).expect("apply option");

    let config = fixture.config();
    if is_c2s {
        assert!(config.c2s_port.is_some());
        assert!(config.s2s_port.is_none());
    } else {
        assert!(config.s2s_port.is_some());
        assert!(config.c2s_port.is_none());
    }
}

#[test]
fn reserving_twice_keeps_only_the_last_port() {
    let mut fixture = unassembled();

    prosody::listen_c2s()(&mut fixture).expect("first reservation");
    let first = fixture.config().c2s_port.expect("first port recorded");
    prosody::listen_c2s()(&mut fixture).expect("second reservation");
    let second = fixture.config().c2s_port.expect("second port recorded");

    assert_ne!(first, second, "each reservation yields a fresh port");
}

#[test]
fn create_user_rejects_malformed_addresses() {
    let mut fixture = unassembled();

    let error =
        prosody::create_user("melocalhost", "password")(&mut fixture).expect_err("must not parse");
    assert!(matches!(
        error,
        FixtureError::Address(JidError::MissingSeparator { .. })
    ));
    assert_eq!(
        fixture.deferred_commands().count(),
        0,
        "nothing may be queued for a malformed address"
    );
    assert!(fixture.identity().is_none());
}

#[test]
fn create_user_queues_registration_and_records_identity() {
    let mut fixture = unassembled();
    prosody::create_user("me@localhost", "password")(&mut fixture).expect("apply option");

    let command = fixture
        .deferred_commands()
        .next()
        .expect("registration queued");
    assert_eq!(command.get_program(), "prosodyctl");
    let args: Vec<String> = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let cfg_path = fixture.config_dir().join(prosody::CFG_FILE_NAME);
    assert_eq!(
        args,
        [
            "--config",
            cfg_path.as_str(),
            "register",
            "me",
            "localhost",
            "password"
        ]
    );

    let identity = fixture.identity().expect("identity recorded");
    assert_eq!(identity.jid().to_string(), "me@localhost");
    assert_eq!(identity.password(), "password");
}

#[test]
fn trust_all_enables_the_module_and_installs_the_script() {
    let mut fixture = unassembled();
    prosody::trust_all()(&mut fixture).expect("apply option");

    assert_eq!(fixture.config().modules, ["trustall"]);

    fixture.render_pending_files().expect("flush pending files");
    let script = fs::read_to_string(fixture.config_dir().join("mod_trustall.lua"))
        .expect("script installed");
    assert!(script.contains("s2s-check-certificate"));
    assert!(script.contains("cert_chain_status = \"valid\""));
}

#[test]
fn trust_all_is_independent_of_other_combinators() {
    let mut fixture = apply([
        prosody::vhost(["example.net"]),
        prosody::trust_all(),
        prosody::modules(["pep"]),
    ]);

    assert_eq!(fixture.config().modules, ["trustall", "pep"]);
    fixture.render_pending_files().expect("flush pending files");
    assert!(fixture.config_dir().join("mod_trustall.lua").is_file());
}

#[test]
fn explicit_config_file_freezes_the_rendered_output() {
    let mut fixture = unassembled();
    prosody::vhost(["first.example"])(&mut fixture).expect("declare vhost");
    prosody::config_file(fixture.config().clone())(&mut fixture).expect("write explicit config");
    prosody::vhost(["second.example"])(&mut fixture).expect("late vhost");

    assert!(fixture.has_arg("--config"));
    assert_eq!(
        fixture.config().vhosts,
        ["first.example", "second.example"],
        "the value stays inspectable"
    );

    let rendered = fs::read_to_string(fixture.config_dir().join(prosody::CFG_FILE_NAME))
        .expect("read config file");
    assert!(rendered.contains("VirtualHost \"first.example\""));
    assert!(
        !rendered.contains("second.example"),
        "options applied after the override must not reach the rendered file"
    );
}

#[test]
fn ctl_points_the_admin_tool_at_the_config_file() {
    let mut fixture = unassembled();
    prosody::ctl(["status"])(&mut fixture).expect("apply option");

    let command = fixture.deferred_commands().next().expect("command queued");
    let args: Vec<String> = command
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        args,
        [
            "--config",
            fixture.config_dir().join(prosody::CFG_FILE_NAME).as_str(),
            "status"
        ]
    );
}
