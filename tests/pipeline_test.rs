//! Poll → filter → push pipeline over in-memory mirrors
//!
//! Covers the cycle-level behaviour: discovery on a stale pool, graceful
//! degradation, eviction, isolation and the seeding/push watermark rules.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::{accounts, aggregator, ids, up, Reply, ScriptedSource, StaticDirectory};
use nitter_feed::config::InitialSnapshot;
use nitter_feed::crawler::InstancePool;
use nitter_feed::feed::{ChannelSink, FeedSession, SessionSettings, SessionState, StopReason};
use nitter_feed::models::{FeedConfiguration, InstanceEndpoint};

const REFRESH: Duration = Duration::from_secs(3600);

fn settings(initial: InitialSnapshot) -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_secs(30),
        refresh_interval: REFRESH,
        initial,
    }
}

// ============================================================================
// PollAggregator
// ============================================================================

/// Empty pool and empty directory: the cycle yields nothing and does not fail
#[tokio::test]
async fn test_empty_pool_returns_nothing() {
    let source = ScriptedSource::new();
    source.script("a", vec![Reply::Posts(vec![1])]);
    let aggregator = aggregator(StaticDirectory::new(vec![]), source.clone(), 1);
    let pool = InstancePool::new();

    let records = aggregator.poll(&accounts(&["a"]), &pool, REFRESH).await;

    assert!(records.is_empty());
    assert!(source.requests_for("a").is_empty(), "no account is polled");
}

/// Directory unreachable: the pool is left as it was
#[tokio::test]
async fn test_discovery_failure_keeps_pool() {
    let source = ScriptedSource::new();
    let aggregator = aggregator(Arc::new(common::UnreachableDirectory), source.clone(), 1);

    let pool = InstancePool::new();
    assert!(aggregator.poll(&accounts(&["a"]), &pool, REFRESH).await.is_empty());
    assert!(pool.is_empty().await);

    // A stale but non-empty pool keeps serving
    let pool = InstancePool::with_candidates([InstanceEndpoint::new("old.example")]);
    source.script("a", vec![Reply::Posts(vec![42])]);
    let records = aggregator
        .poll(&accounts(&["a"]), &pool, Duration::ZERO)
        .await;

    assert_eq!(ids(&records), vec![42]);
    assert_eq!(pool.snapshot().await, vec![InstanceEndpoint::new("old.example")]);
}

/// A failing account is isolated and its mirror evicted
#[tokio::test]
async fn test_failure_isolated_and_evicted() {
    let source = ScriptedSource::new();
    source.script("a", vec![Reply::Posts(vec![10])]);
    source.script("b", vec![Reply::Posts(vec![]), Reply::Fail]);
    source.script("c", vec![Reply::Posts(vec![30])]);
    let directory = StaticDirectory::new(vec![up("m1.example"), up("m2.example")]);
    let aggregator = aggregator(directory, source.clone(), 1);
    let pool = InstancePool::new();

    let records = aggregator
        .poll(&accounts(&["a", "b", "c"]), &pool, REFRESH)
        .await;
    assert_eq!(ids(&records), vec![10, 30]);
    assert_eq!(pool.len().await, 2);

    // Second cycle: "b" fails and takes its mirror with it
    let records = aggregator
        .poll(&accounts(&["a", "b", "c"]), &pool, REFRESH)
        .await;
    assert_eq!(ids(&records), vec![10, 30]);

    let failed_on = source.requests_for("b").pop().unwrap();
    assert_eq!(pool.len().await, 1);
    assert!(!pool.contains(&failed_on).await);
}

/// An evicted mirror is never picked again until the next refresh
#[tokio::test]
async fn test_evicted_mirror_not_picked() {
    let source = ScriptedSource::new();
    source.break_instance("bad.example");
    let directory = StaticDirectory::new(vec![up("good.example"), up("bad.example")]);
    let aggregator = aggregator(directory.clone(), source.clone(), 1);

    // Probes pass for everyone; the breakage starts afterwards
    let pool = InstancePool::with_candidates([
        InstanceEndpoint::new("good.example"),
        InstanceEndpoint::new("bad.example"),
    ]);

    for _ in 0..40 {
        aggregator.poll(&accounts(&["a"]), &pool, REFRESH).await;
    }

    let requests = source.requests_for("a");
    let bad_hits = requests
        .iter()
        .filter(|i| i.as_str() == "bad.example")
        .count();
    assert!(bad_hits <= 1, "bad mirror used {bad_hits} times");
    assert_eq!(pool.snapshot().await, vec![InstanceEndpoint::new("good.example")]);
    assert_eq!(directory.calls(), 0, "fresh pool needs no discovery");
}

/// A hanging mirror is cut off by the fetch deadline
#[tokio::test]
async fn test_slow_mirror_times_out() {
    let source = ScriptedSource::new();
    source.script("slow", vec![Reply::Hang]);
    source.script("fast", vec![Reply::Posts(vec![7])]);
    let aggregator = aggregator(StaticDirectory::new(vec![]), source, 1);
    let pool = InstancePool::with_candidates([InstanceEndpoint::new("m.example")]);

    let start = std::time::Instant::now();
    let records = aggregator
        .poll(&accounts(&["slow", "fast"]), &pool, REFRESH)
        .await;

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(ids(&records), vec![7]);
    assert!(pool.is_empty().await);
}

// ============================================================================
// FeedSession
// ============================================================================

fn session(source: Arc<ScriptedSource>, names: &[&str], initial: InitialSnapshot) -> (FeedSession, FeedConfiguration) {
    let directory = StaticDirectory::new(vec![up("m.example")]);
    let aggregator = Arc::new(aggregator(directory, source, 5));
    let config = FeedConfiguration::new(accounts(names));
    let session = FeedSession::new(aggregator, config.clone(), settings(initial));
    (session, config)
}

/// First cycle seeds, second cycle pushes only what is newer
#[tokio::test]
async fn test_seed_then_push_newer() {
    let source = ScriptedSource::new();
    source.script(
        "a",
        vec![Reply::Posts(vec![100, 105]), Reply::Posts(vec![105, 110])],
    );
    let (mut session, _) = session(source, &["a"], InitialSnapshot::Seed);
    let (mut sink, mut rx) = ChannelSink::channel(16);

    assert_eq!(session.run_cycle(&mut sink).await.unwrap(), 0);
    assert_eq!(session.highest_id_seen(), 105);
    assert_eq!(session.state(), SessionState::Active);

    assert_eq!(session.run_cycle(&mut sink).await.unwrap(), 1);
    assert_eq!(rx.recv().await.unwrap().id, 110);
    assert_eq!(session.highest_id_seen(), 110);

    // Nothing new: idempotent
    assert_eq!(session.run_cycle(&mut sink).await.unwrap(), 0);
    assert_eq!(session.highest_id_seen(), 110);
    assert!(rx.try_recv().is_err());
}

/// Push mode delivers the first snapshot in ascending order
#[tokio::test]
async fn test_push_mode_first_cycle() {
    let source = ScriptedSource::new();
    source.script("a", vec![Reply::Posts(vec![105, 100])]);
    source.script("b", vec![Reply::Posts(vec![103])]);
    let (mut session, _) = session(source, &["a", "b"], InitialSnapshot::Push);
    let (mut sink, mut rx) = ChannelSink::channel(16);

    assert_eq!(session.run_cycle(&mut sink).await.unwrap(), 3);
    let mut pushed = Vec::new();
    while let Ok(record) = rx.try_recv() {
        pushed.push(record.id);
    }
    assert_eq!(pushed, vec![100, 103, 105]);
}

/// Reconfiguring accounts takes effect on the next cycle
#[tokio::test]
async fn test_reconfigure_applies_next_cycle() {
    let source = ScriptedSource::new();
    source.script("a", vec![Reply::Posts(vec![1])]);
    source.script("x", vec![Reply::Posts(vec![50])]);
    source.script("y", vec![Reply::Posts(vec![60])]);
    let (mut session, config) = session(source.clone(), &["a"], InitialSnapshot::Seed);
    let (mut sink, mut rx) = ChannelSink::channel(16);

    session.run_cycle(&mut sink).await.unwrap();
    config.replace(accounts(&["x", "y"])).await;
    assert_eq!(session.run_cycle(&mut sink).await.unwrap(), 2);

    assert_eq!(rx.recv().await.unwrap().id, 50);
    assert_eq!(rx.recv().await.unwrap().id, 60);
    assert_eq!(source.requests_for("a").len(), 1);
}

/// A session loop stops on cancellation and reports its totals
#[tokio::test(start_paused = true)]
async fn test_session_loop_cancel() {
    let source = ScriptedSource::new();
    source.script(
        "a",
        vec![Reply::Posts(vec![1]), Reply::Posts(vec![2]), Reply::Posts(vec![3])],
    );
    let (session, _) = session(source, &["a"], InitialSnapshot::Seed);
    let (mut sink, mut rx) = ChannelSink::channel(16);
    let cancel = CancellationToken::new();

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { session.run(&mut sink, cancel).await })
    };

    assert_eq!(rx.recv().await.unwrap().id, 2);
    assert_eq!(rx.recv().await.unwrap().id, 3);
    cancel.cancel();

    let summary = handle.await.unwrap();
    assert_eq!(summary.reason, StopReason::Cancelled);
    assert_eq!(summary.pushed, 2);
    assert!(rx.recv().await.is_none(), "sink dropped after stop");
}

/// A session stops when the subscriber goes away
#[tokio::test(start_paused = true)]
async fn test_session_loop_subscriber_gone() {
    let source = ScriptedSource::new();
    source.script("a", vec![Reply::Posts(vec![1]), Reply::Posts(vec![2])]);
    let (session, _) = session(source, &["a"], InitialSnapshot::Seed);
    let (mut sink, rx) = ChannelSink::channel(16);
    drop(rx);

    let summary = session.run(&mut sink, CancellationToken::new()).await;
    assert_eq!(summary.reason, StopReason::SinkClosed);
    assert_eq!(summary.highest_id_seen, 2);
}
