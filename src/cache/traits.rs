//! Cache store trait and error types

use crate::cache::CacheEntry;
use crate::queue::QueueItem;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Invalid cached value: {0}")]
    InvalidValue(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A store of previously fetched responses, keyed by canonical URL
///
/// The crawler consults the store to send conditional requests and to
/// report cached metadata when a server answers 304 Not Modified.
/// Implementations must be usable from multiple threads.
pub trait CacheStore: Send + Sync {
    /// Looks up the cached entry for a URL
    fn get(&self, url: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores the response recorded on `item` along with its body
    fn set(&self, item: &QueueItem, body: &[u8]) -> CacheResult<()>;
}
