//! nitter-feed - live post feed aggregated from Nitter mirrors
//!
//! Polls the timelines of a configured set of accounts through a rotating
//! pool of third-party mirror instances and streams newly seen posts to
//! subscribers over WebSocket.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Instance pool, discovery, guarded fetches and per-cycle aggregation
//! - [`feed`] - Watermark filtering and per-subscriber sessions
//! - [`parser`] - Timeline page extraction
//! - [`server`] - HTTP and WebSocket surface
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and domain errors
//!
//! # Example
//!
//! ```no_run
//! use nitter_feed::config::Config;
//! use nitter_feed::server::FeedServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = FeedServer::new(config)?;
//!     server
//!         .start_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod server;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, InitialSnapshot};
    pub use crate::crawler::{
        DirectorySource, FetchGuard, InstanceDiscovery, InstancePool, PollAggregator,
        TimelineSource,
    };
    pub use crate::error::{Error, ErrorCategory, FeedErrorTrait, Result};
    pub use crate::feed::{FeedSession, FeedSink, WatermarkFilter};
    pub use crate::models::{DirectoryEntry, FeedConfiguration, InstanceEndpoint, PostRecord};
}

// Direct re-exports for convenience
pub use models::{InstanceEndpoint, PostRecord};
