//! Structured logging setup
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`, or by the
//! configured level when `RUST_LOG` is unset.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter directives used when `RUST_LOG` is unset
///
/// Upstream HTTP client internals stay at `warn` so per-call selection logs
/// are not drowned out.
fn default_directives(level: &str) -> String {
    format!("openai_balancer={level},tower_http=debug,reqwest=warn,hyper=warn")
}

/// Install the global tracing subscriber
///
/// Only the first call in a process has an effect.
///
/// ```no_run
/// openai_balancer::telemetry::init("info");
/// tracing::info!("Balancer started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    });
}
