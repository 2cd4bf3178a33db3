//! Integration tests for Configuration System

use bcmaps_listener::cli::RunContext;
use bcmaps_listener::config::{ConfigLoader, ValidationError};
use tempfile::TempDir;

#[test]
fn test_full_config_file_builds_run_context() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bcmaps.toml");

    std::fs::write(
        &config_file,
        r#"
[upstream]
instance = "eu.leanix.net"
api_token = "token"

[publish]
api_key = "hs-key"
folder = "capabilities"
file_name = "maps.json"

[auth]
username = "hook"
password = "s3cret"

[server]
host = "127.0.0.1"
port = 9090

[logging]
level = "debug"
format = "json"
output = "stderr"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert!(config.publish.is_enabled());
    assert_eq!(config.publish.file_name, "maps.json");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.logging.format, "json");

    let context = RunContext::new(temp_dir.path().to_path_buf(), Some(config_file)).unwrap();
    assert_eq!(context.config().server.port, 9090);
}

#[test]
fn test_invalid_values_are_all_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bcmaps.toml");

    std::fs::write(
        &config_file,
        r#"
[upstream]
instance = "eu.leanix.net"
api_token = "token"
base_url = "eu.leanix.net"

[publish]
base_url = "api.hubapi.com"

[logging]
format = "yaml"
"#,
    )
    .unwrap();

    let errors = ConfigLoader::load_from_file(&config_file)
        .unwrap()
        .validate()
        .unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ValidationError::Upstream(_)));
    assert!(matches!(errors[1], ValidationError::Publish(_)));
    assert!(matches!(errors[2], ValidationError::Logging(_)));

    let result = RunContext::new(temp_dir.path().to_path_buf(), Some(config_file));
    assert!(result.is_err());
}

#[test]
fn test_malformed_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bcmaps.toml");
    std::fs::write(&config_file, "[server\nport = ").unwrap();

    let error = ConfigLoader::load_from_file(&config_file).unwrap_err();
    assert!(error.to_string().starts_with("Configuration error"));
}
