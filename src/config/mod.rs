//! Configuration management for nitter-feed
//!
//! This module handles loading and validating configuration from environment
//! variables, TOML files and command-line overrides.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Well-known public directory of Nitter mirrors and their status
pub const DEFAULT_DIRECTORY_URL: &str =
    "https://raw.githubusercontent.com/xnaas/nitter-instances/master/history/summary.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Feed session configuration
    pub feed: FeedConfig,

    /// Instance pool configuration
    pub instances: InstancesConfig,

    /// Outgoing HTTP configuration
    pub crawler: CrawlerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS for the API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// What a new session does with the posts already present on its first cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialSnapshot {
    /// Use the first cycle only to establish the watermark
    #[default]
    Seed,
    /// Push everything seen on the first cycle
    Push,
}

/// Feed session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Pause between the end of one cycle and the start of the next, in seconds
    pub poll_interval_secs: u64,

    /// Most recent posts fetched per account per cycle
    pub fetch_depth: usize,

    /// First-cycle behaviour
    pub initial_snapshot: InitialSnapshot,

    /// Accounts polled until the first configuration request
    pub usernames: Vec<String>,
}

/// Instance pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancesConfig {
    /// Directory listing mirrors and their status
    pub directory_url: String,

    /// Pool age after which discovery runs again, in seconds
    pub refresh_interval_secs: u64,

    /// Deadline for a single timeline fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Account fetched when health-checking a mirror
    pub probe_account: String,

    /// Deadline for a single health-check probe, in seconds
    pub probe_timeout_secs: u64,

    /// Deadline for the directory request, in seconds
    pub directory_timeout_secs: u64,

    /// URL scheme used to reach mirrors
    pub scheme: String,
}

/// Outgoing HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent sent on every outgoing request
    ///
    /// When unset, mirror requests rotate through common browser user agents
    /// and the directory client identifies as `nitter-feed/<version>`.
    pub user_agent: Option<String>,

    /// Rate limit across all mirrors (requests per second)
    pub requests_per_second: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    ///
    /// Environment variables:
    /// - `NITTER_FEED_BIND_ADDRESS` [default: 0.0.0.0:8080]
    /// - `NITTER_FEED_POLL_INTERVAL` seconds [default: 30]
    /// - `NITTER_FEED_FETCH_DEPTH` [default: 1]
    /// - `NITTER_FEED_INITIAL_SNAPSHOT` seed|push [default: seed]
    /// - `NITTER_FEED_USERNAMES` comma separated [default: empty]
    /// - `NITTER_FEED_DIRECTORY_URL`
    /// - `NITTER_FEED_REFRESH_INTERVAL` seconds [default: 3600]
    /// - `NITTER_FEED_FETCH_TIMEOUT` seconds [default: 10]
    /// - `NITTER_FEED_PROBE_ACCOUNT` [default: elonmusk]
    /// - `NITTER_FEED_USER_AGENT` [default: rotating browser agents]
    /// - `NITTER_FEED_RATE_LIMIT` requests per second [default: 10]
    /// - `NITTER_FEED_LOG_LEVEL` [default: info]
    /// - `NITTER_FEED_LOG_FORMAT` text|json [default: text]
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("NITTER_FEED_BIND_ADDRESS") {
            config.server.bind_address = addr
                .parse()
                .map_err(|_| Error::config(format!("Invalid bind address: {addr}")))?;
        }

        if let Some(secs) = env_parse("NITTER_FEED_POLL_INTERVAL") {
            config.feed.poll_interval_secs = secs;
        }

        if let Some(depth) = env_parse("NITTER_FEED_FETCH_DEPTH") {
            config.feed.fetch_depth = depth;
        }

        if let Ok(mode) = std::env::var("NITTER_FEED_INITIAL_SNAPSHOT") {
            config.feed.initial_snapshot = match mode.to_lowercase().as_str() {
                "seed" => InitialSnapshot::Seed,
                "push" => InitialSnapshot::Push,
                other => {
                    return Err(Error::config(format!("Invalid initial snapshot mode: {other}")))
                }
            };
        }

        if let Ok(list) = std::env::var("NITTER_FEED_USERNAMES") {
            config.feed.usernames = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(url) = std::env::var("NITTER_FEED_DIRECTORY_URL") {
            config.instances.directory_url = url;
        }

        if let Some(secs) = env_parse("NITTER_FEED_REFRESH_INTERVAL") {
            config.instances.refresh_interval_secs = secs;
        }

        if let Some(secs) = env_parse("NITTER_FEED_FETCH_TIMEOUT") {
            config.instances.fetch_timeout_secs = secs;
        }

        if let Ok(account) = std::env::var("NITTER_FEED_PROBE_ACCOUNT") {
            config.instances.probe_account = account;
        }

        if let Ok(agent) = std::env::var("NITTER_FEED_USER_AGENT") {
            config.crawler.user_agent = Some(agent);
        }

        if let Some(rate) = env_parse("NITTER_FEED_RATE_LIMIT") {
            config.crawler.requests_per_second = rate;
        }

        if let Ok(level) = std::env::var("NITTER_FEED_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("NITTER_FEED_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::with_source(format!("Failed to read config file: {}", path.display()), e)
        })?;

        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.feed.poll_interval_secs == 0 {
            return Err(Error::config("poll_interval_secs must be greater than 0"));
        }

        if self.feed.fetch_depth == 0 {
            return Err(Error::config("fetch_depth must be greater than 0"));
        }

        if self.instances.directory_url.is_empty() {
            return Err(Error::config("directory_url cannot be empty"));
        }

        if self.instances.probe_account.is_empty() {
            return Err(Error::config("probe_account cannot be empty"));
        }

        if self.instances.fetch_timeout_secs == 0
            || self.instances.probe_timeout_secs == 0
            || self.instances.directory_timeout_secs == 0
        {
            return Err(Error::config("timeouts must be greater than 0"));
        }

        if self.instances.refresh_interval_secs == 0 {
            return Err(Error::config("refresh_interval_secs must be greater than 0"));
        }

        if !matches!(self.instances.scheme.as_str(), "http" | "https") {
            return Err(Error::config(format!(
                "scheme must be http or https, got {}",
                self.instances.scheme
            )));
        }

        if let Some(agent) = &self.crawler.user_agent {
            if reqwest::header::HeaderValue::from_str(agent).is_err() || agent.is_empty() {
                return Err(Error::config(format!("Invalid user agent: {agent:?}")));
            }
        }

        if self.crawler.requests_per_second == 0 {
            return Err(Error::config("requests_per_second must be greater than 0"));
        }

        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.feed.poll_interval_secs)
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.instances.refresh_interval_secs)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.instances.fetch_timeout_secs)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.instances.probe_timeout_secs)
    }

    #[must_use]
    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.instances.directory_timeout_secs)
    }

    /// User agent of the directory client
    #[must_use]
    pub fn directory_user_agent(&self) -> String {
        self.crawler
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("nitter-feed/{}", env!("CARGO_PKG_VERSION")))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            fetch_depth: 1,
            initial_snapshot: InitialSnapshot::Seed,
            usernames: Vec::new(),
        }
    }
}

impl Default for InstancesConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            refresh_interval_secs: 3600,
            fetch_timeout_secs: 10,
            probe_account: String::from("elonmusk"),
            probe_timeout_secs: 10,
            directory_timeout_secs: 10,
            scheme: String::from("https"),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            requests_per_second: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}
