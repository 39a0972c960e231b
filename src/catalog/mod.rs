//! Catalog domain model and reconciliation
//!
//! This module holds the scraped record types, the persisted college
//! entity with its field bounds, and the logic that folds scraped records
//! into catalog rows.

mod reconcile;
mod record;

pub use reconcile::{apply_detail, apply_record, reconcile, Reconciliation};
pub use record::{
    truncate_chars, College, CollegeField, CollegeRecord, DetailRecord, FieldError,
};
