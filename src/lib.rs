//! openai-balancer - Transparent load balancing for OpenAI-compatible endpoints
//!
//! This library presents a pool of upstream chat/completions endpoints as a
//! single client handle. Each logical call is routed to one endpoint chosen by
//! a round-robin or random strategy, with the endpoint's model pinned onto the
//! call arguments and the `"auto"` model resolved from the upstream catalog.

pub mod api;
pub mod balancer;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod telemetry;

pub use balancer::{Balancer, BalancingStrategy, Proxy, balancer};
