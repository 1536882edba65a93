//! Feed session: the polling loop behind one subscriber
//!
//! ```text
//!   Idle ──(first post observed)──▶ Active
//!     │                               │
//!     └────(cancel / sink gone)───────┴──▶ Stopped
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, InitialSnapshot};
use crate::crawler::{InstancePool, PollAggregator};
use crate::feed::{FeedSink, WatermarkFilter};
use crate::metrics;
use crate::models::FeedConfiguration;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No post observed yet, the watermark is unset
    Idle,
    /// Streaming new posts
    Active,
    /// Terminal
    Stopped,
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    SinkClosed,
}

/// Totals reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub cycles: u64,
    pub pushed: u64,
    pub highest_id_seen: u64,
    pub reason: StopReason,
}

/// Timing knobs of a session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Pause between the end of a cycle and the start of the next
    pub poll_interval: Duration,
    /// Pool age that triggers discovery
    pub refresh_interval: Duration,
    pub initial: InitialSnapshot,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            refresh_interval: config.refresh_interval(),
            initial: config.feed.initial_snapshot,
        }
    }
}

/// Owns the pool and watermark of one subscriber
pub struct FeedSession {
    aggregator: Arc<PollAggregator>,
    accounts: FeedConfiguration,
    pool: InstancePool,
    watermark: WatermarkFilter,
    settings: SessionSettings,
    state: SessionState,
    cycles: u64,
    pushed: u64,
}

impl FeedSession {
    pub fn new(
        aggregator: Arc<PollAggregator>,
        accounts: FeedConfiguration,
        settings: SessionSettings,
    ) -> Self {
        Self {
            aggregator,
            accounts,
            pool: InstancePool::new(),
            watermark: WatermarkFilter::new(settings.initial),
            settings,
            state: SessionState::Idle,
            cycles: 0,
            pushed: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn highest_id_seen(&self) -> u64 {
        self.watermark.highest()
    }

    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    /// Poll once and push what is new; returns the number of records pushed
    ///
    /// # Errors
    ///
    /// Returns the sink error that interrupted the push. Records already
    /// pushed stay pushed and the watermark keeps the whole cycle.
    pub async fn run_cycle<S: FeedSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<usize, crate::utils::error::SinkError> {
        let start = Instant::now();
        let usernames = self.accounts.usernames().await;

        let records = self
            .aggregator
            .poll(&usernames, &self.pool, self.settings.refresh_interval)
            .await;
        let observed = records.len();
        let fresh = self.watermark.admit(records);

        if self.state == SessionState::Idle && self.watermark.is_seeded() {
            tracing::info!(watermark = self.watermark.highest(), "Feed session seeded");
            self.state = SessionState::Active;
        }

        let mut pushed = 0;
        for record in &fresh {
            sink.push(record).await?;
            pushed += 1;
            self.pushed += 1;
        }

        self.cycles += 1;
        metrics::record_cycle(start.elapsed().as_secs_f64(), pushed);
        tracing::debug!(
            cycle = self.cycles,
            accounts = usernames.len(),
            observed,
            pushed,
            watermark = self.watermark.highest(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        Ok(pushed)
    }

    /// Loop until `cancel` fires or the sink goes away, then close the sink
    ///
    /// Cancellation is observed both during a cycle and during the pause
    /// between cycles.
    pub async fn run<S: FeedSink + ?Sized>(
        mut self,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> SessionSummary {
        tracing::info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            "Feed session started"
        );

        let reason = loop {
            let cycle = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                result = self.run_cycle(sink) => result,
            };

            if let Err(e) = cycle {
                tracing::info!(error = %e, "Subscriber gone, stopping feed session");
                break StopReason::SinkClosed;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        };

        self.state = SessionState::Stopped;
        sink.close().await;

        let summary = SessionSummary {
            cycles: self.cycles,
            pushed: self.pushed,
            highest_id_seen: self.watermark.highest(),
            reason,
        };
        tracing::info!(
            cycles = summary.cycles,
            pushed = summary.pushed,
            reason = ?summary.reason,
            "Feed session stopped"
        );
        summary
    }
}
