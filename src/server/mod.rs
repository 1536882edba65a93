//! HTTP surface of the feed service
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │             Feed Server              │
//! │                                      │
//! │  PUT /feed/configure ──▶ accounts    │
//! │  GET /feed/status                    │
//! │  GET /feed/ws ──▶ FeedSession (1/ws) │
//! │  GET /api/health                     │
//! │  GET /metrics                        │
//! └──────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use nitter_feed::{config::Config, server::FeedServer};
//!
//! let server = FeedServer::new(Config::from_env()?)?;
//! server.start_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

pub mod api;
pub mod server;
pub mod ws;

pub use api::{HealthResponse, MessageResponse, StatusResponse};
pub use server::{AppState, FeedServer, ServerError, ServerInfo};
pub use ws::WsSink;
