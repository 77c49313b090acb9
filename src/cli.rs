//! Command-line interface for openai-balancer
//!
//! Provides argument parsing and subcommand handling for the binary.

use clap::{Parser, Subcommand};

/// Load balancer for OpenAI-compatible endpoints
#[derive(Parser)]
#[command(name = "openai-balancer")]
#[command(version)]
#[command(about = "Load balancer for OpenAI-compatible endpoints")]
#[command(
    long_about = "openai-balancer spreads chat/completions calls across a pool of \
    OpenAI-compatible upstreams using round-robin or random selection, pinning each \
    upstream's model and resolving the \"auto\" model from the upstream catalog."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given)
    Serve,
    /// Validate the configuration file and print the endpoint pool
    Check,
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# openai-balancer configuration
# =============================

# Balancing strategy:
#   - "round-robin": cycle through endpoints in the order listed below (default)
#   - "random": pick a uniformly random endpoint for each call
balancingStrategy = "round-robin"

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "127.0.0.1"
port = 3000

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# ─────────────────────────────────────────────────────────────────────────────
# ENDPOINTS
# ─────────────────────────────────────────────────────────────────────────────
#
# Endpoint fields:
#   - baseURL: API base URL, e.g. "http://host:port/v1" (required)
#   - apiKey:  bearer credential (optional)
#   - model:   model to pin for every call routed here (optional). Without it,
#              callers may send model = "auto" and the single model served by
#              the endpoint is discovered from its /models catalog.

[[endpoints]]
baseURL = "http://your-server:8000/v1"
apiKey = "sk-your-key"
model = "your-model"

[[endpoints]]
baseURL = "http://another-server:8000/v1"
"#
}
