//! Pool of healthy mirror instances
//!
//! Membership is binary: an instance is either usable or it is not. Any fetch
//! failure evicts the instance until the next successful refresh replaces the
//! whole candidate set.

use rand::seq::IteratorRandom;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::InstanceEndpoint;
use crate::utils::error::PoolEmptyError;

#[derive(Debug, Default)]
struct PoolState {
    candidates: HashSet<InstanceEndpoint>,
    last_refreshed: Option<Instant>,
}

/// Set of mirrors that passed the most recent health check
///
/// Safe to share between the concurrent fetches of one cycle; eviction is an
/// idempotent set removal.
#[derive(Debug, Default)]
pub struct InstancePool {
    state: RwLock<PoolState>,
}

impl InstancePool {
    /// Create an empty pool that has never been refreshed
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool already holding `candidates`, refreshed now
    pub fn with_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = InstanceEndpoint>,
    {
        Self {
            state: RwLock::new(PoolState {
                candidates: candidates.into_iter().collect(),
                last_refreshed: Some(Instant::now()),
            }),
        }
    }

    /// Install the result of a successful refresh
    pub async fn replace(&self, candidates: HashSet<InstanceEndpoint>) {
        let mut state = self.state.write().await;
        state.candidates = candidates;
        state.last_refreshed = Some(Instant::now());
        tracing::debug!(size = state.candidates.len(), "Instance pool replaced");
    }

    /// True when the pool is empty, was never refreshed, or is older than `refresh_interval`
    pub async fn is_stale(&self, now: Instant, refresh_interval: Duration) -> bool {
        let state = self.state.read().await;
        match state.last_refreshed {
            _ if state.candidates.is_empty() => true,
            None => true,
            Some(at) => now.saturating_duration_since(at) > refresh_interval,
        }
    }

    /// Pick a usable instance uniformly at random
    pub async fn pick(&self) -> Result<InstanceEndpoint, PoolEmptyError> {
        let state = self.state.read().await;
        let mut rng = rand::thread_rng();
        state
            .candidates
            .iter()
            .choose(&mut rng)
            .cloned()
            .ok_or(PoolEmptyError)
    }

    /// Remove `endpoint` until the next refresh; returns whether it was present
    pub async fn evict(&self, endpoint: &InstanceEndpoint) -> bool {
        let removed = self.state.write().await.candidates.remove(endpoint);
        if removed {
            tracing::debug!(instance = %endpoint, "Instance evicted from pool");
        }
        removed
    }

    pub async fn contains(&self, endpoint: &InstanceEndpoint) -> bool {
        self.state.read().await.candidates.contains(endpoint)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.candidates.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.candidates.is_empty()
    }

    pub async fn last_refreshed(&self) -> Option<Instant> {
        self.state.read().await.last_refreshed
    }

    /// Sorted copy of the current candidates
    pub async fn snapshot(&self) -> Vec<InstanceEndpoint> {
        let mut candidates: Vec<InstanceEndpoint> =
            self.state.read().await.candidates.iter().cloned().collect();
        candidates.sort();
        candidates
    }
}
