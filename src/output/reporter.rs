//! Run event reporting
//!
//! The coordinator and reconciler never log run events directly. They hand
//! each [`SweepEvent`] to an injected [`Reporter`], so callers choose where
//! events go: [`TracingReporter`] forwards them to `tracing`, while
//! [`CollectingReporter`] keeps them in memory for inspection.

use crate::catalog::FieldError;
use std::sync::Mutex;

/// Something noteworthy that happened during a sweep
#[derive(Debug, Clone, PartialEq)]
pub enum SweepEvent {
    /// A listing page was parsed and saved
    PageCompleted {
        page: u32,
        url: String,
        created: usize,
        updated: usize,
    },

    /// A listing page could not be fetched
    PageFailed { page: u32, url: String, error: String },

    /// A listing row could not be parsed
    RowSkipped { page: u32, row: usize, error: String },

    /// A field value was too long and left unchanged
    FieldRejected { college: String, error: FieldError },

    /// A detail page could not be fetched
    DetailFailed {
        college: String,
        url: String,
        error: String,
    },

    /// A batch of detail fetches was applied and saved
    DetailBatchCompleted {
        batch: usize,
        fetched: usize,
        failed: usize,
    },

    /// Every existing college was flagged as deprecated
    DeprecatedMarked { count: u64 },

    /// Colleges not observed in this run were deleted
    StaleDeleted { count: u64 },

    /// The deletion sweep did not run
    PruneSkipped { reason: String },
}

/// Receives run events
pub trait Reporter: Send + Sync {
    fn report(&self, event: SweepEvent);
}

/// Forwards events to `tracing` at a level matching their severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: SweepEvent) {
        match event {
            SweepEvent::PageCompleted {
                page,
                url,
                created,
                updated,
            } => {
                tracing::info!(
                    "Page {} done ({}): {} created, {} updated",
                    page,
                    url,
                    created,
                    updated
                );
            }
            SweepEvent::PageFailed { page, url, error } => {
                tracing::error!("Failed to fetch page {} ({}): {}", page, url, error);
            }
            SweepEvent::RowSkipped { page, row, error } => {
                tracing::warn!("Skipped row {} on page {}: {}", row, page, error);
            }
            SweepEvent::FieldRejected { college, error } => {
                tracing::warn!("{}: {}", college, error);
            }
            SweepEvent::DetailFailed {
                college,
                url,
                error,
            } => {
                tracing::warn!("Detail fetch for {} ({}) failed: {}", college, url, error);
            }
            SweepEvent::DetailBatchCompleted {
                batch,
                fetched,
                failed,
            } => {
                tracing::info!(
                    "Detail batch {} saved: {} fetched, {} failed",
                    batch,
                    fetched,
                    failed
                );
            }
            SweepEvent::DeprecatedMarked { count } => {
                tracing::info!("Marked {} existing colleges as deprecated", count);
            }
            SweepEvent::StaleDeleted { count } => {
                tracing::info!("Deleted {} stale colleges", count);
            }
            SweepEvent::PruneSkipped { reason } => {
                tracing::warn!("Stale colleges kept: {}", reason);
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<SweepEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events received so far
    pub fn events(&self) -> Vec<SweepEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, event: SweepEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
