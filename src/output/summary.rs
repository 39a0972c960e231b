//! Sweep results and output errors

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Counters for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub run_id: i64,

    /// Listing pages fetched and saved
    pub pages_visited: u64,

    pub added: u64,
    pub updated: u64,

    /// Rows removed by the stale sweep, `None` when it did not run
    pub deleted: Option<u64>,

    pub details_fetched: u64,
    pub details_failed: u64,
    pub rows_skipped: u64,
    pub fields_rejected: u64,

    /// Paging stopped on a listing fetch failure after the first page
    pub interrupted: bool,
}

impl SweepSummary {
    /// Formats the line printed after a successful sweep
    ///
    /// ```
    /// use college_sweep::SweepSummary;
    ///
    /// let summary = SweepSummary { added: 2, updated: 5, ..SweepSummary::default() };
    /// assert_eq!(
    ///     summary.summary_line(),
    ///     "Total colleges added: 2, updated: 5, deleted: skipped"
    /// );
    /// ```
    pub fn summary_line(&self) -> String {
        let deleted = match self.deleted {
            Some(count) => count.to_string(),
            None => "skipped".to_string(),
        };
        format!(
            "Total colleges added: {}, updated: {}, deleted: {}",
            self.added, self.updated, deleted
        )
    }
}
