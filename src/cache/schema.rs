//! Database schema for the SQLite cache store

/// SQL schema for the cache database
pub const SCHEMA_SQL: &str = r#"
-- One row per cached URL; the latest response wins
CREATE TABLE IF NOT EXISTS cache_entries (
    url TEXT PRIMARY KEY,
    etag TEXT,
    last_modified TEXT,
    content_type TEXT,
    status_code INTEGER NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cache_stored_at ON cache_entries(stored_at);
"#;

/// Initializes the cache schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
