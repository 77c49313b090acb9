//! Tests for configuration validation
//!
//! Construction must fail fast with a configuration error for an empty
//! endpoint list, an endpoint without an address, or an unknown strategy.

use openai_balancer::config::{BalancerConfig, Config, EndpointConfig};
use openai_balancer::error::BalancerError;
use openai_balancer::{Balancer, balancer};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("should create temp file");
    file.write_all(content.as_bytes())
        .expect("should write temp file");
    file
}

#[test]
fn test_empty_endpoint_list_is_config_error() {
    let err = balancer(&BalancerConfig::new(vec![])).unwrap_err();
    assert!(
        matches!(err, BalancerError::Config(ref msg) if msg.contains("No endpoints provided")),
        "got: {:?}",
        err
    );
}

#[test]
fn test_endpoint_without_address_is_config_error() {
    let config = BalancerConfig::new(vec![
        EndpointConfig::new("http://localhost:1234/v1"),
        EndpointConfig::new(""),
    ]);
    let err = Balancer::new(&config).unwrap_err();
    assert!(
        matches!(err, BalancerError::Config(ref msg) if msg.contains("No baseURL provided for endpoint #1")),
        "got: {:?}",
        err
    );
}

#[test]
fn test_unknown_strategy_is_config_error() {
    let config = BalancerConfig::new(vec![EndpointConfig::new("http://localhost:1234/v1")])
        .with_strategy("least-conn");
    let err = balancer(&config).unwrap_err();
    assert!(
        matches!(err, BalancerError::Config(ref msg) if msg.contains("least-conn")),
        "got: {:?}",
        err
    );
}

#[test]
fn test_both_strategies_are_accepted() {
    for strategy in ["round-robin", "random"] {
        let config = BalancerConfig::new(vec![EndpointConfig::new("http://localhost:1234/v1")])
            .with_strategy(strategy);
        let balancer = Balancer::new(&config).expect("known strategy should be accepted");
        assert_eq!(balancer.strategy().as_str(), strategy);
    }
}

#[test]
fn test_from_file_loads_valid_config() {
    let file = write_config(
        r#"
balancingStrategy = "random"

[server]
host = "0.0.0.0"
port = 8080

[[endpoints]]
baseURL = "http://localhost:1234/v1"
model = "llama-3"
"#,
    );

    let config = Config::from_file(file.path()).expect("should load config");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.balancer.endpoints()[0].model(), Some("llama-3"));
}

#[test]
fn test_from_file_missing_file_is_read_error() {
    let err = Config::from_file("/definitely/not/here/config.toml").unwrap_err();
    assert!(matches!(err, BalancerError::ConfigFileRead { .. }));
    assert!(err.is_config());
}

#[test]
fn test_from_file_bad_toml_is_parse_error_with_path() {
    let file = write_config("[[endpoints]\nbaseURL = ");
    let err = Config::from_file(file.path()).unwrap_err();
    match err {
        BalancerError::ConfigParseFailed { path, .. } => {
            assert_eq!(path, file.path().display().to_string());
        }
        other => panic!("expected ConfigParseFailed, got {:?}", other),
    }
}

#[test]
fn test_from_file_rejects_unknown_strategy() {
    let file = write_config(
        r#"
balancingStrategy = "least-conn"

[[endpoints]]
baseURL = "http://localhost:1234/v1"
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    match err {
        BalancerError::ConfigValidationFailed { reason, .. } => {
            assert!(reason.contains("Invalid balancing strategy least-conn"));
        }
        other => panic!("expected ConfigValidationFailed, got {:?}", other),
    }
}

#[test]
fn test_from_file_rejects_file_without_endpoints() {
    let file = write_config("balancingStrategy = \"round-robin\"\n");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, BalancerError::ConfigValidationFailed { .. }));
}
