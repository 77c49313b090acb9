//! Prometheus metrics collection for the balancer
//!
//! Tracks:
//! - Balancing selections per endpoint
//! - Model discovery attempts per endpoint and outcome
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;

/// Outcome of one model discovery attempt, used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Exactly one model found and pinned
    Resolved,
    /// Catalog had no usable entry
    Empty,
    /// Catalog had more than one entry
    Ambiguous,
    /// Catalog query itself failed
    Failed,
}

impl ResolutionOutcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Empty => "empty",
            Self::Ambiguous => "ambiguous",
            Self::Failed => "failed",
        }
    }
}

/// Metrics collector for the balancer
///
/// Endpoint labels are base URLs, so cardinality is bounded by the configured pool.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    selections_total: IntCounterVec,
    model_resolutions_total: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let selections_total = IntCounterVec::new(
            Opts::new(
                "balancer_selections_total",
                "Number of times each endpoint was selected by the balancing strategy",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(selections_total.clone()))?;

        let model_resolutions_total = IntCounterVec::new(
            Opts::new(
                "balancer_model_resolutions_total",
                "Automatic model discovery attempts by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )?;
        registry.register(Box::new(model_resolutions_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            selections_total,
            model_resolutions_total,
        })
    }

    pub fn record_selection(&self, endpoint: &str) {
        self.selections_total.with_label_values(&[endpoint]).inc();
    }

    pub fn record_resolution(&self, endpoint: &str, outcome: ResolutionOutcome) {
        self.model_resolutions_total
            .with_label_values(&[endpoint, outcome.as_str()])
            .inc();
    }

    /// Current selection count for an endpoint
    pub fn selections(&self, endpoint: &str) -> u64 {
        self.selections_total.with_label_values(&[endpoint]).get()
    }

    /// Current discovery attempt count for an endpoint and outcome
    pub fn resolutions(&self, endpoint: &str, outcome: ResolutionOutcome) -> u64 {
        self.model_resolutions_total
            .with_label_values(&[endpoint, outcome.as_str()])
            .get()
    }

    /// Encode all registered metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
