//! Automatic model discovery for the `"auto"` model sentinel
//!
//! When a call asks for `model: "auto"` and its endpoint has no pinned model,
//! the endpoint's catalog is queried once and its single model is pinned.
//! Concurrent callers for the same endpoint share one in-flight discovery.
//! A failed discovery leaves the endpoint unpinned, so the next `"auto"` call
//! queries the catalog again.

use super::client::EndpointClient;
use crate::error::{BalancerError, BalancerResult};
use crate::metrics::{Metrics, ResolutionOutcome};
use serde_json::Value;

/// Model value requesting automatic discovery
pub const AUTO_MODEL: &str = "auto";

/// True when the first call argument is an object whose `model` is `"auto"`
pub fn requests_auto(args: &[Value]) -> bool {
    args.first()
        .and_then(|first| first.get("model"))
        .and_then(Value::as_str)
        == Some(AUTO_MODEL)
}

/// Pin a discovered model onto `client` if the call requests `"auto"` and none is pinned yet
///
/// # Errors
///
/// - `BalancerError::ModelDiscovery` if the catalog has no usable entry
/// - `BalancerError::ModelAmbiguity` if the catalog lists more than one model
/// - any error the catalog query itself returns, unchanged
pub async fn resolve_if_needed(
    client: &EndpointClient,
    args: &[Value],
    metrics: &Metrics,
) -> BalancerResult<()> {
    if !requests_auto(args) || client.model().is_some() {
        return Ok(());
    }

    client
        .model_cell()
        .get_or_try_init(|| discover(client, metrics))
        .await?;

    Ok(())
}

async fn discover(client: &EndpointClient, metrics: &Metrics) -> BalancerResult<String> {
    let endpoint = client.base_url();

    let models = match client.handle().list_models().await {
        Ok(models) => models,
        Err(e) => {
            metrics.record_resolution(endpoint, ResolutionOutcome::Failed);
            tracing::error!(
                endpoint = %endpoint,
                error = %e,
                "Model catalog query failed"
            );
            return Err(e);
        }
    };

    let first = models
        .first()
        .and_then(Option::as_deref)
        .filter(|id| !id.is_empty());
    let Some(first) = first else {
        metrics.record_resolution(endpoint, ResolutionOutcome::Empty);
        tracing::error!(endpoint = %endpoint, "Model catalog returned no usable model");
        return Err(BalancerError::ModelDiscovery {
            endpoint: endpoint.to_string(),
        });
    };

    if models.len() > 1 {
        metrics.record_resolution(endpoint, ResolutionOutcome::Ambiguous);
        tracing::error!(
            endpoint = %endpoint,
            count = models.len(),
            "Model catalog lists several models, cannot pick one automatically"
        );
        return Err(BalancerError::ModelAmbiguity {
            endpoint: endpoint.to_string(),
            count: models.len(),
        });
    }

    metrics.record_resolution(endpoint, ResolutionOutcome::Resolved);
    tracing::info!(endpoint = %endpoint, model = %first, "Pinned discovered model");
    Ok(first.to_string())
}
