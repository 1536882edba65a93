//! Error types for the nitter-feed pipeline
//!
//! This module defines the domain errors raised while talking to mirror
//! instances, the instance directory and the configuration intake.

use std::time::Duration;
use thiserror::Error;

use crate::models::InstanceEndpoint;

/// Errors that can occur while extracting posts from a timeline page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The page has no timeline container (error page, captcha, etc.)
    #[error("Timeline not found in page")]
    TimelineNotFound,

    /// A timeline item lacks a required element or attribute
    #[error("Timeline item is missing {field}")]
    MissingField { field: &'static str },

    /// The status link does not carry a numeric id
    #[error("Failed to extract status ID from link: {0}")]
    IdExtractionFailed(String),

    /// The post date could not be understood
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Errors returned by a timeline source for a single page fetch
#[derive(Error, Debug)]
pub enum TimelineError {
    /// Connection, TLS or body read failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The mirror answered with a non-success status
    #[error("Server error: {0}")]
    Status(u16),

    /// The endpoint/account pair does not form a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The configured user agent is not a valid header value
    #[error("Invalid user agent: {0}")]
    InvalidUserAgent(String),

    /// The page was fetched but could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Errors surfaced by the fetch guard
#[derive(Error, Debug)]
pub enum FetchError {
    /// The mirror did not answer within the deadline
    #[error("Instance {instance} timed out after {timeout:?}")]
    Timeout {
        instance: InstanceEndpoint,
        timeout: Duration,
    },

    /// The mirror answered but the fetch failed
    #[error("Instance {instance} failed: {source}")]
    Upstream {
        instance: InstanceEndpoint,
        #[source]
        source: TimelineError,
    },
}

impl FetchError {
    /// The instance the failure is attributed to
    pub fn instance(&self) -> &InstanceEndpoint {
        match self {
            Self::Timeout { instance, .. } | Self::Upstream { instance, .. } => instance,
        }
    }

    /// Short label used for logs and metrics
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Upstream { .. } => "upstream",
        }
    }
}

/// Errors that can occur while refreshing the instance list
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The directory could not be reached
    #[error("Directory unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The directory answered with a non-success status
    #[error("Directory returned status {0}")]
    Status(u16),

    /// The directory did not answer in time
    #[error("Directory timed out after {0:?}")]
    Timeout(Duration),

    /// The directory body is not the expected JSON listing
    #[error("Malformed directory listing: {0}")]
    Decode(#[from] serde_json::Error),
}

/// No usable instance is left in the pool
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Instance pool is empty")]
pub struct PoolEmptyError;

/// Errors raised by the configuration intake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Body is not valid JSON
    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),

    /// Body has no `usernames` key
    #[error("Missing usernames field")]
    MissingUsernames,

    /// `usernames` is present but not a list
    #[error("Username list is not a list")]
    NotAList,

    /// A list entry is not a string
    #[error("Username at index {index} is not a string")]
    NonStringEntry { index: usize },
}

/// Errors raised when pushing to a subscriber
#[derive(Error, Debug)]
pub enum SinkError {
    /// The subscriber went away
    #[error("Sink closed")]
    Closed,

    /// The record could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The transport failed while sending
    #[error("Transport error: {0}")]
    Transport(String),
}
