//! Prometheus metrics for the feed service
//!
//! This module provides metrics tracking for:
//! - Polling: cycle count and duration, posts pushed, fetch failures by cause
//! - Instance pool: mirrors admitted by discovery, evictions, discovery outcomes
//! - Sessions: number of connected subscribers
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for polling metrics
struct PollMetrics {
    cycles: Counter,
    cycle_duration: Histogram,
    posts_pushed: Counter,
    fetch_failures: CounterVec,
}

/// Container for instance pool and session metrics
struct PoolMetrics {
    discovered_instances: Gauge,
    evictions: Counter,
    discovery_runs: CounterVec,
    active_sessions: Gauge,
}

static POLL_METRICS: OnceLock<PollMetrics> = OnceLock::new();

static POOL_METRICS: OnceLock<PoolMetrics> = OnceLock::new();

/// Outcome of the first initialization attempt
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything and
/// later calls return its outcome.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = nitter_feed::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    METRICS_INIT
        .get_or_init(|| register_all().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

fn register_all() -> Result<(), Box<dyn std::error::Error>> {
    let poll = PollMetrics {
        cycles: register_counter!(
            "nitter_feed_poll_cycles_total",
            "Total number of completed polling cycles"
        )?,
        cycle_duration: register_histogram!(
            "nitter_feed_poll_cycle_duration_seconds",
            "Time spent polling every configured account once",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
        )?,
        posts_pushed: register_counter!(
            "nitter_feed_posts_pushed_total",
            "Total posts delivered to subscribers"
        )?,
        fetch_failures: register_counter_vec!(
            "nitter_feed_fetch_failures_total",
            "Total failed timeline fetches by cause",
            &["cause"]
        )?,
    };

    let pool = PoolMetrics {
        discovered_instances: register_gauge!(
            "nitter_feed_discovered_instances",
            "Number of mirrors admitted by the most recent discovery run"
        )?,
        evictions: register_counter!(
            "nitter_feed_instance_evictions_total",
            "Total mirrors evicted after a failed fetch"
        )?,
        discovery_runs: register_counter_vec!(
            "nitter_feed_discovery_runs_total",
            "Total instance discovery runs by outcome",
            &["outcome"]
        )?,
        active_sessions: register_gauge!(
            "nitter_feed_active_sessions",
            "Number of connected feed subscribers"
        )?,
    };

    POLL_METRICS.set(poll).map_err(|_| "Poll metrics already initialized")?;
    POOL_METRICS.set(pool).map_err(|_| "Pool metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    POLL_METRICS.get().is_some() && POOL_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a completed polling cycle
pub fn record_cycle(duration_secs: f64, pushed: usize) {
    let Some(m) = POLL_METRICS.get() else {
        return;
    };

    m.cycles.inc();
    m.cycle_duration.observe(duration_secs);
    if pushed > 0 {
        m.posts_pushed.inc_by(pushed as f64);
    }
}

/// Record a failed fetch and the eviction that follows it
pub fn record_fetch_failure(cause: &str) {
    if let Some(m) = POLL_METRICS.get() {
        m.fetch_failures.with_label_values(&[cause]).inc();
    }
    if let Some(m) = POOL_METRICS.get() {
        m.evictions.inc();
    }
}

/// Record the outcome of a discovery run (`ok`, `empty` or `error`)
///
/// `admitted` is the size of the healthy set a successful run produced. Pools
/// shrink by eviction afterwards; that shows up in the eviction counter, not here.
pub fn record_discovery(outcome: &str, admitted: Option<usize>) {
    let Some(m) = POOL_METRICS.get() else {
        return;
    };

    m.discovery_runs.with_label_values(&[outcome]).inc();
    if let Some(size) = admitted {
        m.discovered_instances.set(size as f64);
    }
}

/// Update the number of connected subscribers
pub fn set_active_sessions(count: usize) {
    if let Some(m) = POOL_METRICS.get() {
        m.active_sessions.set(count as f64);
    }
}

// ============================================================================
// Tests
// ============================================================================
