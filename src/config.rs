//! Configuration management for the balancer
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Field names follow the upstream client conventions (`baseURL`, `apiKey`,
//! `balancingStrategy`); snake_case aliases are accepted as well.

use crate::balancer::BalancingStrategy;
use crate::error::{BalancerError, BalancerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Root configuration structure for the binary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(flatten)]
    pub balancer: BalancerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Balancer configuration: the strategy plus the ordered endpoint list
///
/// The strategy is kept as the raw configured string so that an unknown name
/// surfaces as a `BalancerError::Config` from `validate()` rather than as a
/// deserialization error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BalancerConfig {
    #[serde(
        rename = "balancingStrategy",
        alias = "balancing_strategy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    balancing_strategy: Option<String>,
    #[serde(default)]
    endpoints: Vec<EndpointConfig>,
}

impl BalancerConfig {
    /// Create a configuration from an ordered endpoint list using the default strategy
    pub fn new(endpoints: Vec<EndpointConfig>) -> Self {
        Self {
            balancing_strategy: None,
            endpoints,
        }
    }

    /// Set the balancing strategy by name ("round-robin" or "random")
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.balancing_strategy = Some(strategy.into());
        self
    }

    /// Get the configured endpoints, in configured order
    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    /// Resolve the balancing strategy, defaulting to round-robin when unset
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` for any name outside {round-robin, random}.
    pub fn strategy(&self) -> BalancerResult<BalancingStrategy> {
        match self.balancing_strategy.as_deref() {
            None | Some("") => Ok(BalancingStrategy::default()),
            Some(name) => BalancingStrategy::from_str(name),
        }
    }

    /// Validate the configuration
    ///
    /// Called by `Balancer::new()`, and by `Config::from_file()` so that a
    /// bad file is rejected before the server starts.
    pub fn validate(&self) -> BalancerResult<()> {
        self.strategy()?;

        if self.endpoints.is_empty() {
            return Err(BalancerError::Config(
                "No endpoints provided. Add at least one [[endpoints]] entry with a baseURL."
                    .to_string(),
            ));
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let base_url = endpoint.base_url();
            if base_url.is_empty() {
                return Err(BalancerError::Config(format!(
                    "No baseURL provided for endpoint #{}",
                    index
                )));
            }
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(BalancerError::Config(format!(
                    "Endpoint #{} has invalid baseURL '{}'. \
                    baseURL must start with 'http://' or 'https://'.",
                    index, base_url
                )));
            }
        }

        Ok(())
    }
}

/// Individual upstream endpoint configuration
///
/// Fields are private; empty strings for `apiKey` and `model` read back as absent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    #[serde(rename = "baseURL", alias = "base_url", default)]
    base_url: String,
    #[serde(
        rename = "apiKey",
        alias = "api_key",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl EndpointConfig {
    /// Create an endpoint configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Get the endpoint base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the credential, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Get the pinned model, if one is configured
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BalancerResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            BalancerError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            BalancerError::ConfigParseFailed { source, .. } => BalancerError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            },
            other => other,
        })?;

        config
            .balancer
            .validate()
            .map_err(|e| BalancerError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            endpoints = config.balancer.endpoints().len(),
            "Loaded balancer configuration"
        );

        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(content: &str) -> BalancerResult<Self> {
        toml::from_str(content).map_err(|source| BalancerError::ConfigParseFailed {
            path: "<inline>".to_string(),
            source,
        })
    }
}
