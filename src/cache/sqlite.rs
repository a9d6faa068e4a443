//! SQLite cache store

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::CacheEntry;
use crate::queue::QueueItem;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Cache store backed by a SQLite database file
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens (or creates) a cache database at `path`
    pub fn open(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory cache
    pub fn in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of cached URLs
    pub fn len(&self) -> CacheResult<usize> {
        let count: i64 =
            self.lock()?
                .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, url: &str) -> CacheResult<Option<CacheEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, etag, last_modified, content_type, status_code, body, stored_at
             FROM cache_entries WHERE url = ?1",
        )?;

        let row = stmt
            .query_row(params![url], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, u16>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()?;

        let Some((url, etag, last_modified, content_type, code, body, stored_at)) = row else {
            return Ok(None);
        };

        let stored_at = DateTime::parse_from_rfc3339(&stored_at)
            .map_err(|e| CacheError::InvalidValue(format!("stored_at '{}': {}", stored_at, e)))?
            .with_timezone(&Utc);

        Ok(Some(CacheEntry {
            url,
            etag,
            last_modified,
            content_type,
            code,
            body,
            stored_at,
        }))
    }

    fn set(&self, item: &QueueItem, body: &[u8]) -> CacheResult<()> {
        let entry = CacheEntry::from_item(item, body);
        self.lock()?.execute(
            "INSERT INTO cache_entries (url, etag, last_modified, content_type, status_code, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(url) DO UPDATE SET
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                content_type = excluded.content_type,
                status_code = excluded.status_code,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                entry.url,
                entry.etag,
                entry.last_modified,
                entry.content_type,
                entry.code,
                entry.body,
                entry.stored_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
