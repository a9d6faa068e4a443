//! Sumi-Crawler: a polite single-host web crawler
//!
//! This crate implements the crawl scheduling and queue-management engine of a
//! web crawler: a bounded-concurrency fetch loop, a de-duplicated and resumable
//! URL frontier, and the link-discovery pipeline that feeds it.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod queue;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is empty")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),

    #[error("Relative path ascends above the root: {0}")]
    AboveRoot(String),
}

/// Frontier queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Resource already exists in queue: {0}")]
    Duplicate(String),

    #[error("Queue item {id} is out of range (queue length {len})")]
    OutOfRange { id: usize, len: usize },

    #[error("Unrecognized statistic: {0}")]
    UnknownStatistic(String),

    #[error("Queue snapshot is empty")]
    EmptySnapshot,

    #[error("Malformed queue snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueueError {
    /// Returns true for the expected, recoverable duplicate-insertion case
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Errors raised by fetch and download conditions, or by their registries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("Condition failed: {0}")]
    Failed(String),

    #[error("Condition {0} is not registered")]
    NotFound(u64),

    #[error("Condition reference is not registered")]
    NotRegistered,
}

/// Errors surfaced by a transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Body stream error: {0}")]
    Body(String),

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Fetch task failed: {0}")]
    Task(String),
}

/// Result type alias for Sumi-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEvent, Crawler, SignalKind};
pub use queue::{FrontierQueue, ItemFilter, QueueItem, StateData};
pub use state::FetchStatus;
pub use url::{resolve, ResolvedUrl};
