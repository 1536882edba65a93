//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nitter_feed::crawler::{DirectorySource, InstanceDiscovery, PollAggregator, TimelineSource};
use nitter_feed::models::{DirectoryEntry, InstanceEndpoint, PostRecord};
use nitter_feed::utils::error::{DiscoveryError, TimelineError};

/// Create a post with the given id
pub fn post(account: &str, id: u64) -> PostRecord {
    PostRecord {
        id,
        timestamp: Utc.with_ymd_and_hms(2023, 1, 5, 15, 4, 0).unwrap(),
        url: format!("https://twitter.com/{account}/status/{id}#m"),
        full_name: account.to_string(),
        username: format!("@{account}"),
        content: format!("post {id}"),
    }
}

/// One Nitter timeline item
pub fn timeline_item(account: &str, id: u64) -> String {
    format!(
        r#"<div class="timeline-item">
  <a class="tweet-link" href="/{account}/status/{id}#m"></a>
  <div class="tweet-header">
    <a class="fullname" href="/{account}" title="{account}">{account}</a>
    <a class="username" href="/{account}" title="@{account}">@{account}</a>
    <span class="tweet-date"><a href="/{account}/status/{id}#m" title="Jan 5, 2023 · 3:04 PM UTC">1h</a></span>
  </div>
  <div class="tweet-content media-body" dir="auto">post {id}</div>
</div>"#
    )
}

/// A full profile page listing `ids` in order
pub fn timeline_page(account: &str, ids: &[u64]) -> String {
    let items: Vec<String> = ids.iter().map(|&id| timeline_item(account, id)).collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{account} | nitter</title></head>
<body>
  <div class="container">
    <div class="timeline">
{}
    </div>
  </div>
</body>
</html>"#,
        items.join("\n")
    )
}

pub fn up(name: &str) -> DirectoryEntry {
    DirectoryEntry {
        name: name.to_string(),
        status: "up".to_string(),
    }
}

pub fn down(name: &str) -> DirectoryEntry {
    DirectoryEntry {
        name: name.to_string(),
        status: "down".to_string(),
    }
}

/// Directory returning a fixed listing, counting reads
pub struct StaticDirectory {
    entries: Vec<DirectoryEntry>,
    pub calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Arc<Self> {
        Arc::new(Self {
            entries,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn list(&self) -> Result<Vec<DirectoryEntry>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.clone())
    }
}

/// Directory that never answers in time
pub struct UnreachableDirectory;

#[async_trait]
impl DirectorySource for UnreachableDirectory {
    async fn list(&self) -> Result<Vec<DirectoryEntry>, DiscoveryError> {
        Err(DiscoveryError::Timeout(Duration::from_secs(10)))
    }
}

/// What a scripted mirror does for one account
#[derive(Clone)]
pub enum Reply {
    Posts(Vec<u64>),
    Fail,
    Hang,
}

/// In-memory mirror network
///
/// Each account has a queue of replies; the last reply repeats once the
/// queue is down to one. Accounts without a script answer with no posts.
/// Mirrors listed in `broken` fail every request.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, Vec<Reply>>>,
    broken: Mutex<Vec<InstanceEndpoint>>,
    pub requests: Mutex<Vec<(String, InstanceEndpoint)>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, account: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(account.to_string(), replies);
    }

    pub fn break_instance(&self, instance: &str) {
        self.broken
            .lock()
            .unwrap()
            .push(InstanceEndpoint::new(instance));
    }

    pub fn requests_for(&self, account: &str) -> Vec<InstanceEndpoint> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == account)
            .map(|(_, i)| i.clone())
            .collect()
    }

    fn next_reply(&self, account: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(account) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue.first().cloned().unwrap_or(Reply::Posts(Vec::new())),
            None => Reply::Posts(Vec::new()),
        }
    }
}

#[async_trait]
impl TimelineSource for ScriptedSource {
    async fn fetch(
        &self,
        account: &str,
        instance: &InstanceEndpoint,
    ) -> Result<Vec<PostRecord>, TimelineError> {
        self.requests
            .lock()
            .unwrap()
            .push((account.to_string(), instance.clone()));

        if self.broken.lock().unwrap().contains(instance) {
            return Err(TimelineError::Status(503));
        }

        match self.next_reply(account) {
            Reply::Posts(ids) => Ok(ids.into_iter().map(|id| post(account, id)).collect()),
            Reply::Fail => Err(TimelineError::Status(500)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Aggregator over in-memory collaborators, probing with account "probe"
pub fn aggregator(
    directory: Arc<dyn DirectorySource>,
    source: Arc<ScriptedSource>,
    fetch_depth: usize,
) -> PollAggregator {
    let source: Arc<dyn TimelineSource> = source;
    let discovery =
        InstanceDiscovery::new(directory, source.clone(), "probe", Duration::from_millis(200));
    PollAggregator::new(source, discovery, Duration::from_millis(200), fetch_depth)
}

pub fn ids(records: &[PostRecord]) -> Vec<u64> {
    let mut ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids
}

pub fn accounts(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
