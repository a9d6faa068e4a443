//! Response cache used for conditional requests
//!
//! This module provides:
//! - the `CacheStore` trait the crawler talks to
//! - `MemoryCache`, a process-local store
//! - `SqliteCache`, a store persisted to a SQLite file

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCache;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::queue::QueueItem;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// A cached response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub code: u16,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry from a fetched item's recorded response
    pub fn from_item(item: &QueueItem, body: &[u8]) -> Self {
        let headers = &item.state_data.headers;
        Self {
            url: item.url.clone(),
            etag: headers.get("etag").cloned(),
            last_modified: headers.get("last-modified").cloned(),
            content_type: item.state_data.content_type.clone(),
            code: item.state_data.code.unwrap_or(200),
            body: body.to_vec(),
            stored_at: Utc::now(),
        }
    }

    /// Headers to send for a conditional re-fetch of this entry
    pub fn conditional_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(etag) = &self.etag {
            headers.push(("if-none-match".to_string(), etag.clone()));
        }
        if let Some(last_modified) = &self.last_modified {
            headers.push(("if-modified-since".to_string(), last_modified.clone()));
        }
        headers
    }
}

/// In-memory cache store
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, url: &str) -> CacheResult<Option<CacheEntry>> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.get(url).cloned())
    }

    fn set(&self, item: &QueueItem, body: &[u8]) -> CacheResult<()> {
        let entry = CacheEntry::from_item(item, body);
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.insert(entry.url.clone(), entry);
        Ok(())
    }
}
