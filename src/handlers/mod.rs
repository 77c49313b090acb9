//! HTTP request handlers for the balancer front
//!
//! Exposes the balanced client as an OpenAI-compatible HTTP API. Every
//! request performs exactly one balancing selection.

use crate::balancer::{Balancer, BalancingStrategy, Proxy};
use crate::config::BalancerConfig;
use crate::error::BalancerResult;
use crate::metrics::Metrics;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;
pub mod openai;

/// Application state shared across all handlers
///
/// All fields are cheap to clone across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    proxy: Proxy,
    metrics: Arc<Metrics>,
    strategy: BalancingStrategy,
    endpoint_count: usize,
}

impl AppState {
    /// Create state over HTTP upstreams from balancer configuration
    pub fn new(config: &BalancerConfig) -> BalancerResult<Self> {
        Ok(Self::from_balancer(Balancer::new(config)?))
    }

    /// Create state from an already-built balancer
    pub fn from_balancer(balancer: Balancer) -> Self {
        let metrics = balancer.metrics().clone();
        let strategy = balancer.strategy();
        let endpoint_count = balancer.pool().len();

        Self {
            proxy: balancer.into_proxy(),
            metrics,
            strategy,
            endpoint_count,
        }
    }

    /// Get the unbound balancer handle
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn strategy(&self) -> BalancingStrategy {
        self.strategy
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoint_count
    }
}

/// Build the application router with all routes and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/v1/chat/completions", post(openai::chat_completions))
        .route("/v1/completions", post(openai::completions))
        .route("/v1/embeddings", post(openai::embeddings))
        .route("/v1/models", get(openai::models))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn create_test_config() -> BalancerConfig {
        BalancerConfig::new(vec![
            EndpointConfig::new("http://localhost:1234/v1"),
            EndpointConfig::new("http://localhost:1235/v1"),
        ])
        .with_strategy("random")
    }

    #[test]
    fn test_appstate_new_creates_state() {
        let state = AppState::new(&create_test_config()).expect("should create state");
        assert_eq!(state.endpoint_count(), 2);
        assert_eq!(state.strategy(), BalancingStrategy::Random);
        assert!(!state.proxy().is_bound());
    }

    #[test]
    fn test_appstate_rejects_invalid_config() {
        assert!(AppState::new(&BalancerConfig::new(vec![])).is_err());
    }

    #[test]
    fn test_appstate_is_clonable() {
        let state = AppState::new(&create_test_config()).unwrap();
        let state2 = state.clone();
        assert_eq!(state2.endpoint_count(), 2);
    }
}
