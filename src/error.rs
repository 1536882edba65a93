//! Unified error handling for the nitter-feed crate
//!
//! Domain errors live in [`crate::utils::error`]; this module classifies them
//! for logging and holds the `Error` type returned by configuration loading.
//!
//! # Architecture
//!
//! - [`FeedErrorTrait`] - Category lookup implemented by the domain errors
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Configuration and start-up failures

use thiserror::Error;

pub use crate::utils::error::{
    ConfigurationError, DiscoveryError, FetchError, ParseError, TimelineError,
};

/// Common trait for the domain error types
pub trait FeedErrorTrait: std::error::Error {
    /// Get the error category for logs and handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network and HTTP related errors
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for configuration loading and the CLI
#[derive(Error, Debug)]
pub enum Error {
    /// Service configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FeedErrorTrait for FetchError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. } => ErrorCategory::Network,
            Self::Upstream { source, .. } => source.category(),
        }
    }
}

impl FeedErrorTrait for TimelineError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::Status(_) => ErrorCategory::Network,
            Self::InvalidUrl(_) | Self::InvalidUserAgent(_) => ErrorCategory::Config,
            Self::Parse(_) => ErrorCategory::Parsing,
        }
    }
}

impl FeedErrorTrait for DiscoveryError {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl FeedErrorTrait for ConfigurationError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::with_source("Failed to parse TOML config", err)
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
