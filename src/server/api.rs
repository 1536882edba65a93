//! REST API handlers for the feed server

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

use crate::error::FeedErrorTrait;
use crate::metrics;
use crate::models::parse_usernames;

use super::server::AppState;
use super::ws::feed_socket;

// ============================================================================
// API Response Types
// ============================================================================

/// Plain `{"message": ..}` reply
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Current feed configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub usernames: Vec<String>,
    pub active_sessions: usize,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .route("/feed/configure", put(configure))
        .route("/feed/status", get(status))
        .route("/feed/ws", get(feed_socket))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Prometheus exposition
async fn metrics_text() -> axum::response::Response {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Replace the polled account list
///
/// The body is validated by hand rather than through `Json<T>` so that every
/// malformed payload gets the same 400 reply.
async fn configure(State(state): State<AppState>, body: Bytes) -> axum::response::Response {
    match parse_usernames(&body) {
        Ok(usernames) => {
            tracing::info!(count = usernames.len(), usernames = ?usernames, "Feed accounts updated");
            state.accounts.replace(usernames).await;
            (StatusCode::OK, Json(MessageResponse::new("ok"))).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, category = %e.category(), "Rejected feed configuration");
            (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new("malformed username list")),
            )
                .into_response()
        }
    }
}

/// Current account list and subscriber count
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        usernames: state.accounts.usernames().await,
        active_sessions: state.active_sessions.load(Ordering::SeqCst),
    })
}
