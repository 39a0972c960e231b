//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the College-Sweep database.

use crate::storage::traits::{StorageError, StorageResult};

/// Version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track sweep runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    start_page INTEGER NOT NULL DEFAULT 1,
    mode TEXT NOT NULL DEFAULT 'surface',
    pages_visited INTEGER NOT NULL DEFAULT 0,
    added INTEGER NOT NULL DEFAULT 0,
    updated INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER,
    details_fetched INTEGER NOT NULL DEFAULT 0,
    details_failed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

-- The college catalog; name is the lookup key but is not unique
CREATE TABLE IF NOT EXISTS colleges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    city TEXT,
    state TEXT,
    address TEXT,
    phone TEXT,
    site TEXT,
    image_url TEXT,
    college_page_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    is_deprecated INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_colleges_name ON colleges(name);
CREATE INDEX IF NOT EXISTS idx_colleges_deprecated ON colleges(is_deprecated);
"#;

/// Initializes the database schema
///
/// Databases written by a newer schema version are refused.
pub fn initialize_schema(conn: &rusqlite::Connection) -> StorageResult<()> {
    let version = get_schema_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::Database(format!(
            "database schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version stored in the database
pub(crate) fn get_schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
