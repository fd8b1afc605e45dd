//! Shelf-Crawler: a resumable book catalog crawler
//!
//! This crate walks a paginated book catalog site category by category,
//! extracts one structured record per product page, and persists the
//! collected records to a CSV snapshot with periodic checkpoints. The
//! snapshot can be resumed by later runs and queried through [`catalog`].

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for a crawl run
///
/// Only a few of these ever escape [`crawler::Coordinator::run`]: a failed
/// category index fetch, a failed final snapshot write, or a broken phase
/// transition. Item and category failures are absorbed by the coordinator.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Snapshot error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid run phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },
}

/// Network, transport or status failure after the retry budget is spent
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// The URL the failed request was addressed to, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } => Some(url),
            Self::Client(_) => None,
        }
    }

    /// Returns true if the connection layer should try the request again
    ///
    /// Transport failures (connect, read, timeout) and the statuses
    /// 429, 500, 502, 503 and 504 are transient. Everything else is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Transport { source, .. } => !source.is_builder(),
            Self::Client(_) => false,
        }
    }
}

/// Statuses the connection-level retry policy retries
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Returns true if the status code is in [`RETRYABLE_STATUSES`]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// A structural anchor the parser depends on is missing from a document
#[derive(Debug, Error)]
#[error("Failed to parse {url}: {message}")]
pub struct ParseError {
    pub url: String,
    pub message: String,
}

impl ParseError {
    pub fn missing(url: &str, anchor: &str) -> Self {
        Self {
            url: url.to_string(),
            message: format!("missing {}", anchor),
        }
    }
}

/// Snapshot file errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected header in {path}: {found}")]
    Header { path: String, found: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for snapshot operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::Config;
pub use output::BookRecord;
pub use state::{CrawlSession, RunPhase};
