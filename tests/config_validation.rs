//! Integration tests for configuration validation and loading

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::io::Write;
use std::time::Duration;

use milter_protocol::config::{MilterConfig, MAX_PAYLOAD_SIZE, READ_CHUNK_SIZE};
use milter_protocol::policy::RecipientMap;
use milter_protocol::protocol::session::SessionConfig;
use milter_protocol::ProtocolError;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = MilterConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_invalid_server_address() {
    let mut config = MilterConfig::default();
    config.server.address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid server address")));
}

#[test]
fn test_empty_server_address() {
    let mut config = MilterConfig::default();
    config.server.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_max_connections() {
    let mut config = MilterConfig::default();
    config.server.max_connections = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Max connections must be greater than 0")));
}

#[test]
fn test_read_timeout_bounds() {
    let mut config = MilterConfig::default();
    config.server.read_timeout = Duration::from_millis(10);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Read timeout too short")));

    config.server.read_timeout = Duration::from_secs(7200);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Read timeout too long")));
}

#[test]
fn test_zero_read_chunk_size() {
    let mut config = MilterConfig::default();
    config.transport.read_chunk_size = 0;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Read chunk size cannot be 0")));
}

#[test]
fn test_missing_recipient_map_reported() {
    let mut config = MilterConfig::default();
    config.policy.recipient_map_path = Some("/nonexistent/recipients.toml".into());
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Recipient map not found")));
}

#[test]
fn test_validate_strict_joins_errors() {
    let mut config = MilterConfig::default();
    config.server.address = String::new();
    config.server.max_connections = 0;

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(msg)) => {
            assert!(msg.contains("cannot be empty"));
            assert!(msg.contains("Max connections"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_from_toml_partial_sections() {
    let config = MilterConfig::from_toml(
        r#"
        [server]
        address = "0.0.0.0:7000"
        max_connections = 8
        read_timeout = 1500
        shutdown_timeout = 2000

        [logging]
        app_name = "milter"
        log_level = "debug"
        json_format = true
        "#,
    )
    .expect("valid TOML");

    assert_eq!(config.server.address, "0.0.0.0:7000");
    assert_eq!(config.server.max_connections, 8);
    assert_eq!(config.server.read_timeout, Duration::from_millis(1500));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
    assert_eq!(config.transport.max_payload_size, MAX_PAYLOAD_SIZE);

    let session = SessionConfig::from(&config);
    assert_eq!(session.read_chunk_size, READ_CHUNK_SIZE);
    assert_eq!(session.read_timeout, Duration::from_millis(1500));
}

#[test]
fn test_from_toml_rejects_bad_level() {
    let result = MilterConfig::from_toml(
        r#"
        [logging]
        app_name = "milter"
        log_level = "loud"
        json_format = false
        "#,
    );
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_config_and_map_files() {
    let dir = tempfile::tempdir().unwrap();

    let map_path = dir.path().join("recipients.toml");
    let mut map_file = std::fs::File::create(&map_path).unwrap();
    writeln!(map_file, "[recipients]").unwrap();
    writeln!(map_file, "\"list@example.org\" = [\"alice@example.org\"]").unwrap();

    let config_path = dir.path().join("milter.toml");
    std::fs::write(
        &config_path,
        format!(
            "[policy]\nrecipient_map_path = {:?}\n",
            map_path.display().to_string()
        ),
    )
    .unwrap();

    let config = MilterConfig::from_file(&config_path).unwrap();
    assert!(config.validate().is_empty());

    let map = RecipientMap::from_file(config.policy.recipient_map_path.unwrap()).unwrap();
    let senders = map.allowed_senders("<list@example.org>").unwrap();
    assert!(senders.contains("<alice@example.org>"));
}

#[test]
fn test_missing_config_file() {
    let result = MilterConfig::from_file("/nonexistent/milter.toml");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}
