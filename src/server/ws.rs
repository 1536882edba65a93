//! WebSocket endpoint: one feed session per connection
//!
//! The socket is split in two. The write half becomes the session's sink;
//! the read half is drained only to notice when the client goes away.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::Ordering;

use crate::feed::{FeedSession, FeedSink};
use crate::metrics;
use crate::models::PostRecord;
use crate::utils::error::SinkError;

use super::server::AppState;

/// Sink writing each record as one JSON text frame
pub struct WsSink {
    tx: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(tx: SplitSink<WebSocket, Message>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl FeedSink for WsSink {
    async fn push(&mut self, record: &PostRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record)?;
        self.tx
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        // The peer may already be gone
        let _ = self.tx.send(Message::Close(None)).await;
        let _ = self.tx.close().await;
    }
}

/// Upgrade handler for `GET /feed/ws`
pub(super) async fn feed_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_socket(socket, state))
}

async fn run_socket(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = socket.split();
    let cancel = state.shutdown.child_token();

    // Inbound frames carry no meaning; only the end of the stream does
    let reader = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.next().await {
                match frame {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            cancel.cancel();
        })
    };

    let active = state.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_active_sessions(active);
    tracing::info!(active_sessions = active, "Subscriber connected");

    let session = FeedSession::new(
        state.aggregator.clone(),
        state.accounts.clone(),
        state.settings,
    );
    let mut sink = WsSink::new(tx);
    let summary = session.run(&mut sink, cancel.clone()).await;

    cancel.cancel();
    reader.abort();

    let active = state.active_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::set_active_sessions(active);
    tracing::info!(
        active_sessions = active,
        pushed = summary.pushed,
        reason = ?summary.reason,
        "Subscriber disconnected"
    );
}
