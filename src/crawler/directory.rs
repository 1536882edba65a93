//! Client for the public mirror directory

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::crawler::DirectorySource;
use crate::models::DirectoryEntry;
use crate::utils::error::DiscoveryError;

/// Reads the JSON summary of mirrors and their status
///
/// The summary is served as `text/plain`, so the body is decoded as JSON
/// regardless of its content type.
pub struct DirectoryClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl DirectoryClient {
    /// # Errors
    ///
    /// Returns `DiscoveryError::Unreachable` if the HTTP client cannot be created
    pub fn new(url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// # Errors
    ///
    /// Returns `DiscoveryError::Unreachable` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, DiscoveryError> {
        Self::new(
            config.instances.directory_url.clone(),
            config.directory_timeout(),
            &config.directory_user_agent(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DirectorySource for DirectoryClient {
    async fn list(&self) -> Result<Vec<DirectoryEntry>, DiscoveryError> {
        tracing::info!(url = %self.url, "Updating list of mirror instances");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                DiscoveryError::Timeout(self.timeout)
            } else {
                DiscoveryError::Unreachable(e)
            }
        })?;

        let status = response.status();
        tracing::debug!(url = %self.url, status = status.as_u16(), "GET directory");

        if !status.is_success() {
            return Err(DiscoveryError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DiscoveryError::Timeout(self.timeout)
            } else {
                DiscoveryError::Unreachable(e)
            }
        })?;

        let entries: Vec<DirectoryEntry> = serde_json::from_str(&body)?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let client = DirectoryClient::from_config(&config).unwrap();
        assert_eq!(client.url(), crate::config::DEFAULT_DIRECTORY_URL);
        assert_eq!(client.timeout, Duration::from_secs(10));
    }
}
