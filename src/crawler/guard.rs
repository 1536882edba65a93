//! Deadline-bounded fetches with eviction of failing mirrors

use std::time::Duration;

use crate::crawler::{InstancePool, TimelineSource};
use crate::error::FeedErrorTrait;
use crate::metrics;
use crate::models::{InstanceEndpoint, PostRecord};
use crate::utils::error::FetchError;

/// Run one fetch under `timeout`, without touching any pool
///
/// The deadline starts after [`TimelineSource::acquire`] returns. Used
/// directly by discovery probes, where a failure means "not admitted" rather
/// than "evicted".
pub async fn timed_fetch(
    source: &dyn TimelineSource,
    account: &str,
    instance: &InstanceEndpoint,
    timeout: Duration,
) -> Result<Vec<PostRecord>, FetchError> {
    source.acquire().await;

    match tokio::time::timeout(timeout, source.fetch(account, instance)).await {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(source)) => Err(FetchError::Upstream {
            instance: instance.clone(),
            source,
        }),
        Err(_) => Err(FetchError::Timeout {
            instance: instance.clone(),
            timeout,
        }),
    }
}

/// Wraps a [`TimelineSource`] so that every failed fetch evicts its mirror
///
/// There is no retry: the failure is reported once and the account simply
/// contributes nothing to the current cycle.
pub struct FetchGuard<'a> {
    source: &'a dyn TimelineSource,
    pool: &'a InstancePool,
}

impl<'a> FetchGuard<'a> {
    pub fn new(source: &'a dyn TimelineSource, pool: &'a InstancePool) -> Self {
        Self { source, pool }
    }

    pub async fn fetch_with_guard(
        &self,
        account: &str,
        instance: &InstanceEndpoint,
        timeout: Duration,
    ) -> Result<Vec<PostRecord>, FetchError> {
        match timed_fetch(self.source, account, instance, timeout).await {
            Ok(records) => Ok(records),
            Err(e) => {
                match &e {
                    FetchError::Timeout { .. } => {
                        tracing::info!(instance = %instance, account, "Instance seems too slow, removing it");
                    }
                    FetchError::Upstream { source, .. } => {
                        tracing::info!(instance = %instance, account, error = %source, category = %e.category(), "Instance is causing problems, removing it");
                    }
                }

                self.pool.evict(instance).await;
                metrics::record_fetch_failure(e.cause());
                Err(e)
            }
        }
    }
}
