//! Feed server implementation
//!
//! Wires the shared crawler components into the HTTP surface and owns the
//! shutdown token every live session derives from.

use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::crawler::{
    DirectoryClient, DirectorySource, InstanceDiscovery, NitterFetcher, PollAggregator,
    TimelineSource,
};
use crate::feed::SessionSettings;
use crate::models::FeedConfiguration;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Account list shared by every session
    pub accounts: FeedConfiguration,

    /// Poll pipeline shared by every session
    pub aggregator: Arc<PollAggregator>,

    /// Timing of new sessions
    pub settings: SessionSettings,

    /// Parent of every session token
    pub shutdown: CancellationToken,

    /// Number of connected subscribers
    pub active_sessions: Arc<AtomicUsize>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &Config, aggregator: Arc<PollAggregator>) -> Self {
        Self {
            accounts: FeedConfiguration::new(config.feed.usernames.clone()),
            aggregator,
            settings: SessionSettings::from_config(config),
            shutdown: CancellationToken::new(),
            active_sessions: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Feed Server
// ============================================================================

/// HTTP and WebSocket front of the feed
pub struct FeedServer {
    config: Config,
    state: AppState,
}

impl FeedServer {
    /// Create a server talking to real mirrors and the real directory
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let source: Arc<dyn TimelineSource> = Arc::new(
            NitterFetcher::from_config(&config).map_err(|e| ServerError::InitError(e.to_string()))?,
        );
        let directory: Arc<dyn DirectorySource> = Arc::new(
            DirectoryClient::from_config(&config)
                .map_err(|e| ServerError::InitError(e.to_string()))?,
        );

        Ok(Self::with_sources(config, source, directory))
    }

    /// Create a server over custom collaborators
    pub fn with_sources(
        config: Config,
        source: Arc<dyn TimelineSource>,
        directory: Arc<dyn DirectorySource>,
    ) -> Self {
        let discovery = InstanceDiscovery::from_config(&config, directory, source.clone());
        let aggregator = Arc::new(PollAggregator::from_config(&config, source, discovery));
        let state = AppState::new(&config, aggregator);

        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve on the configured address until `shutdown_signal` resolves
    ///
    /// Live sessions are cancelled as soon as the signal fires so that their
    /// sockets close and the graceful shutdown can complete.
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.server.bind_address;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener
    pub async fn serve(
        &self,
        listener: tokio::net::TcpListener,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        tracing::info!("Starting feed server on {}", local);

        let token = self.state.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal.await;
                tracing::info!("Shutdown requested, stopping feed sessions");
                token.cancel();
            })
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Feed server shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.server.bind_address,
            poll_interval_secs: self.config.feed.poll_interval_secs,
            refresh_interval_secs: self.config.instances.refresh_interval_secs,
            cors_enabled: self.config.server.enable_cors,
            request_logging_enabled: self.config.server.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub poll_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Feed Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Poll Interval: {}s\n\
             Pool Refresh: {}s\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.poll_interval_secs,
            self.refresh_interval_secs,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Failed to bind: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}
