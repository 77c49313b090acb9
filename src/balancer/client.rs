//! Endpoint clients and the pool they live in

use crate::api::UpstreamApi;
use crate::config::{BalancerConfig, EndpointConfig};
use crate::error::BalancerResult;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Builds the underlying client handle for one endpoint configuration entry
pub type ClientFactory =
    dyn Fn(&EndpointConfig) -> BalancerResult<Arc<dyn UpstreamApi>> + Send + Sync;

/// Runtime binding of one configured endpoint to its client handle
///
/// The model cell starts filled when the endpoint pins a model, and is
/// otherwise filled at most once by automatic discovery. It is never reset.
pub struct EndpointClient {
    base_url: String,
    api_key: Option<String>,
    model: OnceCell<String>,
    handle: Arc<dyn UpstreamApi>,
}

impl EndpointClient {
    /// Create an endpoint client from its configuration and underlying handle
    pub fn new(endpoint: &EndpointConfig, handle: Arc<dyn UpstreamApi>) -> Self {
        Self {
            base_url: endpoint.base_url().to_string(),
            api_key: endpoint.api_key().map(str::to_string),
            model: OnceCell::new_with(endpoint.model().map(str::to_string)),
            handle,
        }
    }

    /// Get the endpoint base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Get the pinned model (configured or discovered), if any
    pub fn model(&self) -> Option<&str> {
        self.model.get().map(String::as_str)
    }

    /// Get the underlying client handle
    pub fn handle(&self) -> &Arc<dyn UpstreamApi> {
        &self.handle
    }

    pub(crate) fn model_cell(&self) -> &OnceCell<String> {
        &self.model
    }
}

impl fmt::Debug for EndpointClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("model", &self.model())
            .finish()
    }
}

/// Ordered, fixed collection of endpoint clients (never empty)
#[derive(Debug)]
pub struct ClientPool {
    clients: Vec<Arc<EndpointClient>>,
}

impl ClientPool {
    /// Build one client per configured endpoint, preserving configured order
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::Config` if the configuration does not validate,
    /// or whatever the factory returns for an endpoint it cannot build.
    pub fn from_config(config: &BalancerConfig, factory: &ClientFactory) -> BalancerResult<Self> {
        config.validate()?;

        let clients = config
            .endpoints()
            .iter()
            .map(|endpoint| {
                let handle = factory(endpoint)?;
                Ok(Arc::new(EndpointClient::new(endpoint, handle)))
            })
            .collect::<BalancerResult<Vec<_>>>()?;

        tracing::debug!(endpoints = clients.len(), "Built client pool");

        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Always false for a pool built by `from_config`
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<EndpointClient>> {
        self.clients.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EndpointClient>> {
        self.clients.iter()
    }
}
