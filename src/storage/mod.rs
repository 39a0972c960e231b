//! Storage module for persisting the college catalog
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - College upserts, lookups and deprecation sweeps
//! - Run tracking for sweep history

mod schema;
mod sqlite;
mod traits;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::CollectionMode;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> crate::Result<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a sweep run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub start_page: u32,
    pub mode: CollectionMode,
    pub pages_visited: u64,
    pub added: u64,
    pub updated: u64,
    pub deleted: Option<u64>,
    pub details_fetched: u64,
    pub details_failed: u64,
    pub error_message: Option<String>,
}

/// Status of a sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Paging stopped early on a listing fetch failure
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
