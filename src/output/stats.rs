//! Statistics generation from the catalog database
//!
//! This module provides functionality for extracting and displaying
//! catalog statistics from the storage layer.

use crate::catalog::CollegeField;
use crate::storage::{RunRecord, Storage};
use crate::SweepError;

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Total number of colleges stored
    pub total_colleges: u64,

    /// Colleges still flagged as deprecated
    pub deprecated: u64,

    /// Number of colleges with a value, per optional field
    pub field_coverage: Vec<(CollegeField, u64)>,

    /// Colleges per state, largest first
    pub colleges_by_state: Vec<(String, u64)>,

    /// Most recent sweep, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(SweepError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CatalogStatistics, SweepError> {
    let total_colleges = storage.count_colleges()?;
    let deprecated = storage.count_deprecated()?;

    let mut field_coverage = Vec::new();
    for field in CollegeField::ALL {
        if field == CollegeField::Name {
            continue;
        }
        field_coverage.push((field, storage.count_with_field(field)?));
    }

    let colleges_by_state = storage.count_by_state()?;
    let latest_run = storage.get_latest_run()?;

    Ok(CatalogStatistics {
        total_colleges,
        deprecated,
        field_coverage,
        colleges_by_state,
        latest_run,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64) * 100.0
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Total colleges: {}", stats.total_colleges);
    println!("  Deprecated: {}", stats.deprecated);
    println!();

    println!("Field Coverage:");
    for (field, count) in &stats.field_coverage {
        println!(
            "  {}: {} ({:.1}%)",
            field,
            count,
            percentage(*count, stats.total_colleges)
        );
    }
    println!();

    if !stats.colleges_by_state.is_empty() {
        println!("Colleges by State ({}):", stats.colleges_by_state.len());
        for (state, count) in &stats.colleges_by_state {
            println!("  {}: {}", state, count);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            println!("  Mode: {}", run.mode);
            println!("  Pages visited: {}", run.pages_visited);
            println!(
                "  Added: {}, updated: {}, deleted: {}",
                run.added,
                run.updated,
                run.deleted
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "skipped".to_string())
            );
            if let Some(error) = &run.error_message {
                println!("  Error: {}", error);
            }
        }
        None => println!("No sweeps recorded yet."),
    }
}
