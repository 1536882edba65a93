//! Subscriber side of a feed session

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::PostRecord;
use crate::utils::error::SinkError;

/// Push-only destination for new posts
///
/// An error from `push` means the subscriber is gone and ends the session.
#[async_trait]
pub trait FeedSink: Send {
    async fn push(&mut self, record: &PostRecord) -> Result<(), SinkError>;

    /// Release the subscriber; called once when the session stops
    async fn close(&mut self) {}
}

/// Sink forwarding records to an in-process channel
///
/// Used by the `watch` command and by tests.
pub struct ChannelSink {
    tx: mpsc::Sender<PostRecord>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PostRecord>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PostRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl FeedSink for ChannelSink {
    async fn push(&mut self, record: &PostRecord) -> Result<(), SinkError> {
        self.tx
            .send(record.clone())
            .await
            .map_err(|_| SinkError::Closed)
    }
}
