//! Output module for sweep results and reports
//!
//! This module handles:
//! - Run event reporting (`Reporter`)
//! - Sweep summaries
//! - Catalog statistics and markdown export

mod markdown;
mod reporter;
pub mod stats;
mod summary;

pub use markdown::{format_catalog_markdown, write_catalog_markdown};
pub use reporter::{CollectingReporter, Reporter, SweepEvent, TracingReporter};
pub use stats::{load_statistics, print_statistics, CatalogStatistics};
pub use summary::{OutputError, OutputResult, SweepSummary};
