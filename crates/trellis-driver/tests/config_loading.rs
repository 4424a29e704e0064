//! Loading driver configuration from disk

use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use trellis_core::{Command, NotSupportedPolicy};
use trellis_driver::{
    ClientError, Driver, DriverConfig, DriverError, DriverKind, NativeClient,
};

/// Client that answers every command with an empty payload
struct NullClient;

impl NativeClient for NullClient {
    fn execute(&self, _command: &Command) -> Result<Value, ClientError> {
        Ok(json!([]))
    }

    fn begin(&mut self) -> Result<(), ClientError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ClientError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_each_format() {
    let dir = TempDir::new().unwrap();
    let toml = write(
        &dir,
        "driver.toml",
        r#"
kind = "orientdb"

[connection]
host = "graph.internal"
database = "people"

[errors]
not_supported = "warn"
"#,
    );
    let yaml = write(
        &dir,
        "driver.yaml",
        "kind: orientdb\nconnection:\n  host: graph.internal\n  database: people\nerrors:\n  not_supported: warn\n",
    );
    let json = write(
        &dir,
        "driver.json",
        r#"{"kind": "orientdb", "connection": {"host": "graph.internal", "database": "people"}, "errors": {"not_supported": "warn"}}"#,
    );

    let from_toml = DriverConfig::load_from_file(&toml).unwrap();
    assert_eq!(from_toml.kind, DriverKind::OrientDb);
    assert_eq!(from_toml.connection.host, "graph.internal");
    assert_eq!(from_toml.connection.database.as_deref(), Some("people"));
    assert_eq!(from_toml.port(), 2424);
    assert_eq!(from_toml.errors.not_supported, NotSupportedPolicy::Warn);

    assert_eq!(DriverConfig::load_from_file(&yaml).unwrap(), from_toml);
    assert_eq!(DriverConfig::load_from_file(&json).unwrap(), from_toml);
}

#[test]
fn test_unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "driver.ini", "kind = neo4j");

    let err = DriverConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, DriverError::Config(_)));
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();

    let err = DriverConfig::load_from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, DriverError::Config(_)));
}

#[test]
fn test_driver_from_config_applies_kind_and_policy() {
    let config = DriverConfig::from_toml_str(
        r#"
kind = "gremlin-server"

[errors]
not_supported = "ignore"
"#,
    )
    .unwrap();

    let driver = Driver::from_config(&config, NullClient);
    assert_eq!(driver.kind(), DriverKind::GremlinServer);
    assert_eq!(driver.policy(), NotSupportedPolicy::Ignore);
    assert!(driver.is_supported_language("gremlin"));

    let response = driver
        .execute_read(Command::new("g.V()", trellis_core::Dialect::Gremlin))
        .unwrap();
    assert!(response.as_tree().unwrap().is_empty());
}
