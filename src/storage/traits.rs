//! Storage traits and error types
//!
//! This module defines the trait interface for catalog backends and
//! associated error types.

use crate::catalog::{College, CollegeField};
use crate::config::CollectionMode;
use crate::output::SweepSummary;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("College not found: {0}")]
    CollegeNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog storage backends
///
/// Row-level operations are atomic; `save_all` additionally groups a batch
/// of upserts into one transaction.
pub trait Storage {
    // ===== Run Management =====

    /// Opens a new run row in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(
        &mut self,
        config_hash: &str,
        start_page: u32,
        mode: CollectionMode,
    ) -> StorageResult<i64>;

    /// Closes a run with its final counters
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &SweepSummary,
    ) -> StorageResult<()>;

    /// Closes a run as failed with an error message
    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets up to `limit` runs, newest first
    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Catalog =====

    /// Flags every college as deprecated
    ///
    /// # Returns
    ///
    /// The number of rows flagged
    fn mark_all_deprecated(&mut self) -> StorageResult<u64>;

    /// Finds a college by exact name
    ///
    /// When several rows share the name, the oldest one is returned.
    fn find_by_name(&self, name: &str) -> StorageResult<Option<College>>;

    /// Gets a college by ID
    fn get_college(&self, id: i64) -> StorageResult<College>;

    /// Inserts an unsaved college or updates a saved one
    ///
    /// Inserting assigns `id`; updating refreshes `updated_at`.
    fn upsert(&mut self, college: &mut College) -> StorageResult<()>;

    /// Upserts a batch of colleges in a single transaction
    fn save_all(&mut self, colleges: &mut [College]) -> StorageResult<()>;

    /// Deletes every college still flagged as deprecated
    ///
    /// # Returns
    ///
    /// The number of rows deleted
    fn delete_where_deprecated(&mut self) -> StorageResult<u64>;

    /// Gets every college ordered by name
    fn find_all(&self) -> StorageResult<Vec<College>>;

    // ===== Statistics =====

    /// Counts all colleges
    fn count_colleges(&self) -> StorageResult<u64>;

    /// Counts colleges flagged as deprecated
    fn count_deprecated(&self) -> StorageResult<u64>;

    /// Counts colleges with a non-empty value for a field
    fn count_with_field(&self, field: CollegeField) -> StorageResult<u64>;

    /// Counts colleges per state, largest first
    fn count_by_state(&self) -> StorageResult<Vec<(String, u64)>>;
}
