//! Instance discovery and health checking
//!
//! A refresh reads the directory, keeps the mirrors reported as up, and then
//! probes every one of them concurrently with a trial fetch. Only mirrors
//! that answer the probe in time make it into the returned set.

use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::crawler::guard::timed_fetch;
use crate::crawler::{DirectorySource, TimelineSource};
use crate::metrics;
use crate::models::InstanceEndpoint;
use crate::utils::error::DiscoveryError;
use crate::utils::normalize_host;

/// Rebuilds the candidate set of an [`crate::crawler::InstancePool`]
pub struct InstanceDiscovery {
    directory: Arc<dyn DirectorySource>,
    source: Arc<dyn TimelineSource>,
    probe_account: String,
    probe_timeout: Duration,
}

impl InstanceDiscovery {
    pub fn new(
        directory: Arc<dyn DirectorySource>,
        source: Arc<dyn TimelineSource>,
        probe_account: impl Into<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            source,
            probe_account: probe_account.into(),
            probe_timeout,
        }
    }

    pub fn from_config(
        config: &Config,
        directory: Arc<dyn DirectorySource>,
        source: Arc<dyn TimelineSource>,
    ) -> Self {
        Self::new(
            directory,
            source,
            config.instances.probe_account.clone(),
            config.probe_timeout(),
        )
    }

    /// Fetch the directory and return the mirrors that pass a probe
    ///
    /// # Errors
    ///
    /// Fails only when the directory itself cannot be read. Individual probe
    /// failures just exclude the mirror.
    pub async fn refresh(&self) -> Result<HashSet<InstanceEndpoint>, DiscoveryError> {
        let entries = match self.directory.list().await {
            Ok(entries) => entries,
            Err(e) => {
                metrics::record_discovery("error", None);
                return Err(e);
            }
        };

        // BTreeSet keeps probe order and logs stable
        let candidates: BTreeSet<InstanceEndpoint> = entries
            .iter()
            .filter(|entry| entry.is_up())
            .map(|entry| normalize_host(&entry.name))
            .filter(|host| !host.is_empty())
            .map(InstanceEndpoint::new)
            .collect();

        tracing::info!(
            listed = entries.len(),
            up = candidates.len(),
            "Probing mirror instances"
        );

        let start = Instant::now();
        let probes = candidates.iter().map(|instance| async move {
            let result = timed_fetch(
                self.source.as_ref(),
                &self.probe_account,
                instance,
                self.probe_timeout,
            )
            .await;
            (instance, result)
        });

        let mut healthy = HashSet::new();
        let mut blacklisted = Vec::new();
        for (instance, result) in join_all(probes).await {
            match result {
                Ok(_) => {
                    healthy.insert(instance.clone());
                }
                Err(e) => {
                    tracing::debug!(instance = %instance, cause = e.cause(), error = %e, "Probe failed");
                    blacklisted.push(instance.as_str());
                }
            }
        }

        tracing::info!(
            healthy = healthy.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            blacklisted = ?blacklisted,
            "Mirror instances refreshed"
        );

        let outcome = if healthy.is_empty() { "empty" } else { "ok" };
        metrics::record_discovery(outcome, Some(healthy.len()));

        Ok(healthy)
    }
}
