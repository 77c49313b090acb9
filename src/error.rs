//! Error types for the balancer
//!
//! Every failure the balancer or an upstream produces is a `BalancerError`.
//! The interception layer passes these through to callers untouched.
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the balancer
#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed fetching model list from {endpoint}, specify the model manually")]
    ModelDiscovery { endpoint: String },

    #[error("Multiple models found at {endpoint} ({count}), specify the model manually")]
    ModelAmbiguity { endpoint: String, count: usize },

    #[error("Upstream {endpoint} returned {status}: {body}")]
    Upstream {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid call arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown member '{0}'")]
    UnknownMember(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BalancerError {
    /// True for the configuration class of errors (fatal at construction time)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ConfigFileRead { .. }
                | Self::ConfigParseFailed { .. }
                | Self::ConfigValidationFailed { .. }
        )
    }
}

impl IntoResponse for BalancerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ModelDiscovery { .. } | Self::ModelAmbiguity { .. } => StatusCode::BAD_GATEWAY,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidArguments(_) | Self::UnknownMember(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type BalancerResult<T> = Result<T, BalancerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = BalancerError::Config("No endpoints provided".to_string());
        assert_eq!(err.to_string(), "Configuration error: No endpoints provided");
        assert!(err.is_config());
    }

    #[test]
    fn test_discovery_error_message() {
        let err = BalancerError::ModelDiscovery {
            endpoint: "http://localhost:1234/v1".to_string(),
        };
        assert!(err.to_string().contains("specify the model manually"));
        assert!(!err.is_config());
    }

    #[test]
    fn test_ambiguity_error_message() {
        let err = BalancerError::ModelAmbiguity {
            endpoint: "http://localhost:1234/v1".to_string(),
            count: 3,
        };
        assert!(err.to_string().starts_with("Multiple models found"));
    }

    #[test]
    fn test_config_error_response_status() {
        let err = BalancerError::Config("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_error_keeps_upstream_status() {
        let err = BalancerError::Upstream {
            endpoint: "http://localhost:1234/v1".to_string(),
            status: 429,
            body: "slow down".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_discovery_error_response_status() {
        let err = BalancerError::ModelDiscovery {
            endpoint: "x".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_arguments_response_status() {
        let err = BalancerError::InvalidArguments("missing id".to_string());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
