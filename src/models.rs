// Core data structures for the nitter-feed pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::utils::error::ConfigurationError;

/// A single post scraped from a mirror timeline
///
/// `id` is assigned upstream and grows with time, so ordering by id is
/// ordering by publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub full_name: String,
    pub username: String,
    pub content: String,
}

/// Host name of a mirror instance (e.g. `nitter.example.net`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceEndpoint(String);

impl InstanceEndpoint {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceEndpoint {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

/// Entry of the public instance directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub status: String,
}

impl DirectoryEntry {
    /// Only entries reported as "up" are worth probing
    pub fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// The account list polled by every session
///
/// Cloning shares the list. Writers replace the whole list; readers take a
/// snapshot at the start of each cycle, so a replacement is observed by the
/// next cycle and never by one already in flight.
#[derive(Debug, Clone, Default)]
pub struct FeedConfiguration {
    usernames: Arc<RwLock<Vec<String>>>,
}

impl FeedConfiguration {
    pub fn new(usernames: Vec<String>) -> Self {
        Self {
            usernames: Arc::new(RwLock::new(usernames)),
        }
    }

    /// Copy of the current account list
    pub async fn usernames(&self) -> Vec<String> {
        self.usernames.read().await.clone()
    }

    /// Replace the account list (last write wins)
    pub async fn replace(&self, usernames: Vec<String>) {
        *self.usernames.write().await = usernames;
    }
}

/// Validate a configuration intake payload of the form `{"usernames": [..]}`
pub fn parse_usernames(body: &[u8]) -> Result<Vec<String>, ConfigurationError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ConfigurationError::MalformedBody(e.to_string()))?;

    let list = value
        .get("usernames")
        .ok_or(ConfigurationError::MissingUsernames)?
        .as_array()
        .ok_or(ConfigurationError::NotAList)?;

    list.iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or(ConfigurationError::NonStringEntry { index })
        })
        .collect()
}
