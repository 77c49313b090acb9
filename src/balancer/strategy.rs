//! Balancing strategies
//!
//! Round-robin walks the pool cyclically starting at index 0; random picks a
//! uniformly distributed index and keeps no state between calls.

use super::client::{ClientPool, EndpointClient};
use crate::error::BalancerError;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Selection policy, validated against the closed set {round-robin, random}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BalancingStrategy {
    #[default]
    RoundRobin,
    Random,
}

impl BalancingStrategy {
    /// Configuration name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for BalancingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BalancingStrategy {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            other => Err(BalancerError::Config(format!(
                "Invalid balancing strategy {}. Expected one of: round-robin, random",
                other
            ))),
        }
    }
}

/// Stateful selector applying a strategy to a pool
///
/// `cursor` holds the index the next round-robin selection returns. It is
/// advanced with a single atomic increment-and-wrap, so concurrent selections
/// never observe the same slot twice within one cycle.
#[derive(Debug)]
pub struct Selector {
    strategy: BalancingStrategy,
    cursor: AtomicUsize,
}

impl Selector {
    pub fn new(strategy: BalancingStrategy) -> Self {
        Self {
            strategy,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> BalancingStrategy {
        self.strategy
    }

    /// Pick the index of the next client to use for a pool of `len` clients
    ///
    /// `len` must be non-zero; pools enforce this at construction.
    pub fn next_index(&self, len: usize) -> usize {
        debug_assert!(len > 0, "selector used with an empty pool");

        match self.strategy {
            BalancingStrategy::RoundRobin => self
                .cursor
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    Some((current + 1) % len)
                })
                .unwrap_or_else(|current| current),
            BalancingStrategy::Random => rand::rng().random_range(0..len),
        }
    }

    /// Select the next client from the pool
    pub fn select_next<'a>(&self, pool: &'a ClientPool) -> &'a Arc<EndpointClient> {
        let index = self.next_index(pool.len());
        let client = pool
            .get(index)
            .expect("Defensive check: selected index is always below pool length");

        tracing::debug!(
            strategy = %self.strategy,
            index = index,
            endpoint = %client.base_url(),
            "Selected endpoint"
        );

        client
    }
}
