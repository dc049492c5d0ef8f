// tests/config_errors.rs

use std::io::Write;

use tempfile::NamedTempFile;
use unitjob::config::load_and_validate;
use unitjob::errors::UnitJobError;
use unitjob::manager::BusKind;
use unitjob::unit::{DependencyKind, UnitProperty};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_is_loaded_and_coerced() {
    let file = config_file(
        r#"
[manager]
bus = "session"

[journal]
program = "/usr/bin/journalctl"
extra_args = ["--no-hostname"]
buffer = 8

[properties]
Description = "launched by unitjob"
After = ["network.target"]
PIDs = [1234]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.manager.bus, BusKind::Session);

    let command = cfg.log_command();
    assert_eq!(command.program().to_str(), Some("/usr/bin/journalctl"));
    assert_eq!(command.buffer(), 8);
    assert_eq!(
        command.args_for("x.service"),
        vec!["-u", "x.service", "-f", "-o", "json", "--no-hostname"]
    );

    // `[properties]` is a BTreeMap, so properties come out sorted by name.
    assert_eq!(
        cfg.properties,
        vec![
            UnitProperty::Dependency(DependencyKind::After, vec!["network.target".into()]),
            UnitProperty::Description("launched by unitjob".into()),
            UnitProperty::Pids(vec![1234]),
        ]
    );
}

#[test]
fn empty_config_uses_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.manager.bus, BusKind::System);
    assert_eq!(cfg.log_command().program().to_str(), Some("journalctl"));
    assert!(cfg.properties.is_empty());
}

#[test]
fn unknown_property_returns_unsupported_property() {
    let file = config_file(
        r#"
[properties]
MemoryMax = "1G"
"#,
    );

    match load_and_validate(file.path()) {
        Err(UnitJobError::UnsupportedProperty(name)) => assert_eq!(name, "MemoryMax"),
        Err(e) => panic!("Expected UnsupportedProperty, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn policy_property_in_config_is_rejected() {
    let file = config_file(
        r#"
[properties]
RemainAfterExit = false
"#,
    );

    match load_and_validate(file.path()) {
        Err(UnitJobError::ConfigError(msg)) => assert!(msg.contains("RemainAfterExit")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn zero_buffer_is_rejected() {
    let file = config_file(
        r#"
[journal]
buffer = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(UnitJobError::ConfigError(msg)) => assert!(msg.contains("buffer")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_bus_is_a_toml_error() {
    let file = config_file(
        r#"
[manager]
bus = "kernel"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(UnitJobError::TomlError(_))
    ));
}
