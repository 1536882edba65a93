//! One polling cycle: refresh the pool if needed, then fetch every account concurrently

use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::crawler::{FetchGuard, InstanceDiscovery, InstancePool, TimelineSource};
use crate::error::FeedErrorTrait;
use crate::models::PostRecord;

/// Fans a cycle out to one guarded fetch per account and merges the results
///
/// Shared between sessions; each session brings its own pool.
pub struct PollAggregator {
    source: Arc<dyn TimelineSource>,
    discovery: InstanceDiscovery,
    fetch_timeout: Duration,
    fetch_depth: usize,
}

impl PollAggregator {
    pub fn new(
        source: Arc<dyn TimelineSource>,
        discovery: InstanceDiscovery,
        fetch_timeout: Duration,
        fetch_depth: usize,
    ) -> Self {
        Self {
            source,
            discovery,
            fetch_timeout,
            fetch_depth: fetch_depth.max(1),
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn TimelineSource>,
        discovery: InstanceDiscovery,
    ) -> Self {
        Self::new(source, discovery, config.fetch_timeout(), config.feed.fetch_depth)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Run one cycle for `usernames`
    ///
    /// Never fails: discovery errors keep the current pool, an empty pool
    /// yields no records, and a failed account contributes nothing while the
    /// others proceed.
    pub async fn poll(
        &self,
        usernames: &[String],
        pool: &InstancePool,
        discovery_interval: Duration,
    ) -> Vec<PostRecord> {
        if pool
            .is_stale(tokio::time::Instant::now(), discovery_interval)
            .await
        {
            match self.discovery.refresh().await {
                Ok(healthy) => pool.replace(healthy).await,
                Err(e) => {
                    let pool_size = pool.len().await;
                    tracing::warn!(error = %e, category = %e.category(), pool_size, "Instance discovery failed, keeping current pool");
                }
            }
        }

        if pool.is_empty().await {
            tracing::warn!("No usable instance, skipping cycle");
            return Vec::new();
        }

        let guard = FetchGuard::new(self.source.as_ref(), pool);
        let fetches = usernames
            .iter()
            .map(|account| self.fetch_account(&guard, pool, account));

        join_all(fetches).await.into_iter().flatten().collect()
    }

    async fn fetch_account(
        &self,
        guard: &FetchGuard<'_>,
        pool: &InstancePool,
        account: &str,
    ) -> Vec<PostRecord> {
        let instance = match pool.pick().await {
            Ok(instance) => instance,
            Err(e) => {
                tracing::debug!(account, error = %e, "No instance left for account");
                return Vec::new();
            }
        };

        let start = Instant::now();
        match guard
            .fetch_with_guard(account, &instance, self.fetch_timeout)
            .await
        {
            Ok(mut records) => {
                records.truncate(self.fetch_depth);
                tracing::info!(
                    account,
                    instance = %instance,
                    count = records.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Fetched timeline"
                );
                records
            }
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::DirectorySource;
    use crate::models::{DirectoryEntry, InstanceEndpoint};
    use crate::utils::error::{DiscoveryError, TimelineError};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        entries: Vec<DirectoryEntry>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DirectorySource for CountingDirectory {
        async fn list(&self) -> Result<Vec<DirectoryEntry>, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    /// Returns `[id, id + 1]` for every account, except "broken" which fails
    struct AccountSource;

    #[async_trait]
    impl TimelineSource for AccountSource {
        async fn fetch(
            &self,
            account: &str,
            _instance: &InstanceEndpoint,
        ) -> Result<Vec<PostRecord>, TimelineError> {
            if account == "broken" {
                return Err(TimelineError::Status(500));
            }
            let base = account.len() as u64 * 100;
            Ok((0..2)
                .map(|i| PostRecord {
                    id: base + i,
                    timestamp: Utc::now(),
                    url: format!("https://twitter.com/{account}/status/{}", base + i),
                    full_name: account.to_string(),
                    username: format!("@{account}"),
                    content: String::new(),
                })
                .collect())
        }
    }

    fn aggregator(directory: Arc<CountingDirectory>, depth: usize) -> PollAggregator {
        let source: Arc<dyn TimelineSource> = Arc::new(AccountSource);
        let discovery =
            InstanceDiscovery::new(directory, source.clone(), "probe", Duration::from_secs(1));
        PollAggregator::new(source, discovery, Duration::from_secs(1), depth)
    }

    fn directory(names: &[&str]) -> Arc<CountingDirectory> {
        Arc::new(CountingDirectory {
            entries: names
                .iter()
                .map(|n| DirectoryEntry {
                    name: n.to_string(),
                    status: "up".to_string(),
                })
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_poll_refreshes_stale_pool() {
        let dir = directory(&["m1.example"]);
        let aggregator = aggregator(dir.clone(), 1);
        let pool = InstancePool::new();

        let records = aggregator
            .poll(&["ab".to_string()], &pool, Duration::from_secs(3600))
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 200);
        assert_eq!(dir.calls.load(Ordering::SeqCst), 1);

        // Fresh pool: no second directory read
        aggregator
            .poll(&["ab".to_string()], &pool, Duration::from_secs(3600))
            .await;
        assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_respects_fetch_depth() {
        let aggregator = aggregator(directory(&["m1.example"]), 5);
        let pool = InstancePool::new();

        let records = aggregator
            .poll(&["a".to_string(), "abc".to_string()], &pool, Duration::from_secs(3600))
            .await;

        let mut ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 101, 300, 301]);
    }

    #[tokio::test]
    async fn test_poll_empty_directory_yields_nothing() {
        let aggregator = aggregator(directory(&[]), 1);
        let pool = InstancePool::new();

        let records = aggregator
            .poll(&["a".to_string()], &pool, Duration::from_secs(3600))
            .await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_poll_failure_is_isolated() {
        let aggregator = aggregator(directory(&["m1.example", "m2.example", "m3.example"]), 1);
        let pool = InstancePool::new();

        let accounts = vec!["a".to_string(), "broken".to_string(), "abc".to_string()];
        let records = aggregator
            .poll(&accounts, &pool, Duration::from_secs(3600))
            .await;

        let mut ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 300]);
        assert_eq!(pool.len().await, 2, "the failing instance is evicted");
    }
}
