//! HTTP fetcher for Nitter profile timelines
//!
//! This module provides the production [`TimelineSource`] with features including:
//! - User-Agent rotation
//! - Rate limiting with governor, shared by every session and awaited
//!   through [`TimelineSource::acquire`]
//! - Timeline extraction through [`TimelineParser`]

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::crawler::TimelineSource;
use crate::models::{InstanceEndpoint, PostRecord};
use crate::parser::TimelineParser;
use crate::utils::error::TimelineError;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Nitter timeline fetcher
///
/// The HTTP client carries no timeout of its own: deadlines are applied per
/// fetch by [`crate::crawler::FetchGuard`].
pub struct NitterFetcher {
    /// HTTP client with compression enabled
    client: Client,

    /// Rate limiter to control request frequency across all mirrors
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Timeline page parser
    parser: TimelineParser,

    /// URL scheme used to reach mirrors (`https` in production)
    scheme: String,

    /// Posts kept per page
    max_items: usize,

    /// Fixed user agent; `None` rotates through [`USER_AGENTS`]
    user_agent: Option<HeaderValue>,
}

impl NitterFetcher {
    /// Create a fetcher with the given rate limit, reaching mirrors over https
    ///
    /// # Errors
    ///
    /// Returns `TimelineError::Transport` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, TimelineError> {
        Self::with_scheme(requests_per_second, "https")
    }

    /// Create a fetcher with a custom scheme (`http` for local mirrors and tests)
    ///
    /// # Errors
    ///
    /// Returns `TimelineError::Transport` if the HTTP client cannot be created
    pub fn with_scheme(requests_per_second: u32, scheme: &str) -> Result<Self, TimelineError> {
        let client = Client::builder()
            .gzip(true)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            parser: TimelineParser::new(),
            scheme: scheme.to_string(),
            max_items: 1,
            user_agent: None,
        })
    }

    /// Create a fetcher from the service configuration
    ///
    /// # Errors
    ///
    /// Returns `TimelineError::Transport` if the HTTP client cannot be created,
    /// or `TimelineError::InvalidUserAgent` for an unusable configured agent
    pub fn from_config(config: &Config) -> Result<Self, TimelineError> {
        let fetcher = Self::with_scheme(config.crawler.requests_per_second, &config.instances.scheme)?
            .with_max_items(config.feed.fetch_depth);

        match &config.crawler.user_agent {
            Some(agent) => fetcher.with_user_agent(agent),
            None => Ok(fetcher),
        }
    }

    /// Send `agent` on every request instead of rotating
    ///
    /// # Errors
    ///
    /// Returns `TimelineError::InvalidUserAgent` if `agent` is not a valid header value
    pub fn with_user_agent(mut self, agent: &str) -> Result<Self, TimelineError> {
        let value = HeaderValue::from_str(agent)
            .map_err(|_| TimelineError::InvalidUserAgent(agent.to_string()))?;
        self.user_agent = Some(value);
        Ok(self)
    }

    /// Keep at most `max_items` posts per page
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    /// Build `{scheme}://{instance}/{account}`
    pub fn timeline_url(
        &self,
        account: &str,
        instance: &InstanceEndpoint,
    ) -> Result<Url, TimelineError> {
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, instance))
            .map_err(|e| TimelineError::InvalidUrl(format!("{instance}: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| TimelineError::InvalidUrl(instance.to_string()))?
            .pop_if_empty()
            .push(account);

        Ok(url)
    }

    /// Build HTTP headers for mirror requests
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let agent = match &self.user_agent {
            Some(agent) => agent.clone(),
            None => HeaderValue::from_static(self.random_user_agent()),
        };
        headers.insert(USER_AGENT, agent);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        headers
    }

    /// Get a random user agent from the pool
    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
    }
}

#[async_trait]
impl TimelineSource for NitterFetcher {
    async fn acquire(&self) {
        self.rate_limiter.until_ready().await;
    }

    async fn fetch(
        &self,
        account: &str,
        instance: &InstanceEndpoint,
    ) -> Result<Vec<PostRecord>, TimelineError> {
        let url = self.timeline_url(account, instance)?;

        let response = self
            .client
            .get(url.clone())
            .headers(self.build_headers())
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "GET timeline");

        if !status.is_success() {
            return Err(TimelineError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let records = self.parser.parse(&body, self.max_items)?;

        tracing::debug!(account, instance = %instance, count = records.len(), "Retrieved timeline page");
        Ok(records)
    }
}
