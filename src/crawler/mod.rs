//! Mirror crawling: instance pool, discovery and guarded timeline fetches
//!
//! The two network collaborators are hidden behind traits so the pool and
//! aggregation logic can run against in-memory doubles:
//!
//! - [`TimelineSource`] - one page of an account's most recent posts from one mirror
//! - [`DirectorySource`] - the public listing of mirrors and their status
//!
//! ```text
//! PollAggregator ──▶ InstancePool::pick ──▶ FetchGuard ──▶ TimelineSource
//!       │                    ▲                   │
//!       │                    └──── evict ◀───────┘
//!       └──(stale)──▶ InstanceDiscovery ──▶ DirectorySource + probes
//! ```

pub mod aggregator;
pub mod directory;
pub mod discovery;
pub mod fetcher;
pub mod guard;
pub mod pool;

use async_trait::async_trait;

use crate::models::{DirectoryEntry, InstanceEndpoint, PostRecord};
use crate::utils::error::{DiscoveryError, TimelineError};

pub use aggregator::PollAggregator;
pub use directory::DirectoryClient;
pub use discovery::InstanceDiscovery;
pub use fetcher::NitterFetcher;
pub use guard::FetchGuard;
pub use pool::InstancePool;

/// Fetches the most recent posts of an account from a given mirror
///
/// Local throttling lives in [`TimelineSource::acquire`], not in `fetch`, so
/// that a caller can start its deadline only once a request may go out. A
/// wait on our own limiter is never the mirror's fault.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Wait until a request may be sent
    async fn acquire(&self) {}

    /// Posts in page order, pinned and unavailable entries already removed
    async fn fetch(
        &self,
        account: &str,
        instance: &InstanceEndpoint,
    ) -> Result<Vec<PostRecord>, TimelineError>;
}

/// Lists known mirrors together with their reported status
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list(&self) -> Result<Vec<DirectoryEntry>, DiscoveryError>;
}
