//! Load balancing across a pool of upstream endpoints
//!
//! The entry point is [`balancer()`], which validates configuration, builds the
//! client pool and returns an unbound [`Proxy`] that behaves like a single
//! upstream client:
//!
//! ```no_run
//! # async fn demo() -> openai_balancer::error::BalancerResult<()> {
//! use openai_balancer::config::{BalancerConfig, EndpointConfig};
//! use serde_json::json;
//!
//! let config = BalancerConfig::new(vec![
//!     EndpointConfig::new("http://gpu-1:8000/v1"),
//!     EndpointConfig::new("http://gpu-2:8000/v1").with_model("llama-3-70b"),
//! ]);
//! let client = openai_balancer::balancer(&config)?;
//!
//! let response = client
//!     .call(
//!         &["chat", "completions", "create"],
//!         vec![json!({"model": "auto", "messages": [{"role": "user", "content": "hi"}]})],
//!     )
//!     .await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

mod client;
mod proxy;
mod resolver;
mod strategy;

pub use client::{ClientFactory, ClientPool, EndpointClient};
pub use proxy::{InterceptedCall, Member, Proxy};
pub use resolver::{AUTO_MODEL, requests_auto, resolve_if_needed};
pub use strategy::{BalancingStrategy, Selector};

use crate::api::{HttpApiClient, UpstreamApi};
use crate::config::{BalancerConfig, EndpointConfig};
use crate::error::{BalancerError, BalancerResult};
use crate::metrics::Metrics;
use std::fmt;
use std::sync::Arc;

/// Build a balanced client handle over the configured HTTP endpoints
///
/// # Errors
///
/// Returns `BalancerError::Config` for an empty endpoint list, an endpoint
/// without a base URL, or an unrecognized balancing strategy.
pub fn balancer(config: &BalancerConfig) -> BalancerResult<Proxy> {
    Ok(Balancer::new(config)?.into_proxy())
}

/// Client pool plus the strategy selecting from it
pub struct Balancer {
    pool: ClientPool,
    selector: Selector,
    metrics: Arc<Metrics>,
}

impl Balancer {
    /// Create a balancer over `HttpApiClient` upstreams
    pub fn new(config: &BalancerConfig) -> BalancerResult<Self> {
        Self::with_factory(config, |endpoint: &EndpointConfig| {
            let client: Arc<dyn UpstreamApi> = Arc::new(HttpApiClient::from_endpoint(endpoint)?);
            Ok(client)
        })
    }

    /// Create a balancer whose underlying client handles come from `factory`
    pub fn with_factory<F>(config: &BalancerConfig, factory: F) -> BalancerResult<Self>
    where
        F: Fn(&EndpointConfig) -> BalancerResult<Arc<dyn UpstreamApi>> + Send + Sync + 'static,
    {
        let strategy = config.strategy()?;
        let pool = ClientPool::from_config(config, &factory)?;
        let metrics = Metrics::new()
            .map_err(|e| BalancerError::Internal(format!("Failed to register metrics: {}", e)))?;

        tracing::info!(
            strategy = %strategy,
            endpoints = pool.len(),
            "Balancer initialized"
        );

        Ok(Self {
            pool,
            selector: Selector::new(strategy),
            metrics: Arc::new(metrics),
        })
    }

    /// Replace the metrics collector (e.g., to share one registry with a server)
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Turn this balancer into its unbound interception handle
    pub fn into_proxy(self) -> Proxy {
        Proxy::unbound(Arc::new(self))
    }

    /// Perform one balancing selection
    pub fn next_client(&self) -> Arc<EndpointClient> {
        let client = self.selector.select_next(&self.pool).clone();
        self.metrics.record_selection(client.base_url());
        client
    }

    pub fn strategy(&self) -> BalancingStrategy {
        self.selector.strategy()
    }

    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Base URL and pinned model of each endpoint, in configured order
    pub fn endpoints(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.pool
            .iter()
            .map(|client| (client.base_url(), client.model()))
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl fmt::Debug for Balancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Balancer")
            .field("strategy", &self.selector.strategy())
            .field("pool", &self.pool)
            .finish()
    }
}
