//! Markdown catalog export
//!
//! Renders every stored college as a table, preceded by the most recent run.

use crate::catalog::{College, CollegeField};
use crate::output::summary::OutputResult;
use crate::storage::{RunRecord, Storage};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown catalog to `output_path`
///
/// # Returns
///
/// The number of colleges written
pub fn write_catalog_markdown(storage: &dyn Storage, output_path: &Path) -> OutputResult<usize> {
    let colleges = storage.find_all()?;
    let latest_run = storage.get_latest_run()?;
    let markdown = format_catalog_markdown(&colleges, latest_run.as_ref());

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(colleges.len())
}

// Pipes and newlines would break the table row
fn cell(value: Option<&str>) -> String {
    value
        .unwrap_or("")
        .replace('|', "\\|")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn link_cell(text: &str, url: Option<&str>) -> String {
    match url {
        Some(url) => format!("[{}]({})", cell(Some(text)), url),
        None => cell(Some(text)),
    }
}

/// Formats the catalog as markdown
///
/// # Arguments
///
/// * `colleges` - Colleges in display order
/// * `latest_run` - Run shown in the header section, if any
pub fn format_catalog_markdown(colleges: &[College], latest_run: Option<&RunRecord>) -> String {
    let mut md = String::new();

    md.push_str("# College Catalog\n\n");

    if let Some(run) = latest_run {
        md.push_str("## Latest Run\n\n");
        md.push_str(&format!("- **Run ID**: {}\n", run.id));
        md.push_str(&format!("- **Started**: {}\n", run.started_at));
        if let Some(finished) = &run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished));
        }
        md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        md.push_str(&format!("- **Mode**: {}\n", run.mode));
        md.push_str(&format!("- **Pages Visited**: {}\n", run.pages_visited));
        md.push_str(&format!("- **Added**: {}\n", run.added));
        md.push_str(&format!("- **Updated**: {}\n", run.updated));
        match run.deleted {
            Some(deleted) => md.push_str(&format!("- **Deleted**: {}\n", deleted)),
            None => md.push_str("- **Deleted**: skipped\n"),
        }
        md.push('\n');
    }

    md.push_str(&format!("## Colleges ({})\n\n", colleges.len()));

    if colleges.is_empty() {
        md.push_str("_No colleges stored._\n");
        return md;
    }

    md.push_str("| Name | City | State | Address | Phone | Site |\n");
    md.push_str("|------|------|-------|---------|-------|------|\n");
    for college in colleges {
        let site = match college.site.as_deref() {
            Some(site) => format!("<{}>", site),
            None => String::new(),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            link_cell(&college.name, college.college_page_url.as_deref()),
            cell(college.field(CollegeField::City)),
            cell(college.field(CollegeField::State)),
            cell(college.field(CollegeField::Address)),
            cell(college.field(CollegeField::Phone)),
            site
        ));
    }

    md
}
