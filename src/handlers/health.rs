//! Health check endpoint
//!
//! Reports liveness of the balancer process itself. Upstreams are not probed.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Configured balancing strategy
    pub strategy: &'static str,
    /// Number of upstream endpoints in the pool
    pub endpoints: usize,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            strategy: state.strategy().as_str(),
            endpoints: state.endpoint_count(),
        }),
    )
}
