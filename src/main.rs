//! College-Sweep main entry point
//!
//! This is the command-line interface for the College-Sweep directory scraper.

use anyhow::Context;
use clap::Parser;
use college_sweep::config::{load_config_with_hash, CollectionMode, Config};
use college_sweep::crawler::{listing_url, run_sweep, PageBound, SweepOptions};
use college_sweep::output::{load_statistics, print_statistics, write_catalog_markdown};
use college_sweep::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// College-Sweep: a college directory scraper
///
/// College-Sweep pages through a college directory, stores every listed
/// college in a SQLite catalog and optionally visits each college's page
/// for contact details.
#[derive(Parser, Debug)]
#[command(name = "college-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A college directory scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First listing page to fetch
    #[arg(value_name = "START_PAGE")]
    start_page: Option<u32>,

    /// Last listing page to fetch
    #[arg(value_name = "END_PAGE", conflicts_with = "quantity")]
    end_page: Option<u32>,

    /// Number of listing pages to fetch, counting the start page
    #[arg(long, value_name = "N")]
    quantity: Option<u32>,

    /// Detail collection mode (overrides the config)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<CollectionMode>,

    /// Delete colleges not seen during this sweep
    #[arg(long, conflicts_with = "keep_stale")]
    prune: bool,

    /// Keep colleges not seen during this sweep
    #[arg(long)]
    keep_stale: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the sweep plan without fetching anything
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show catalog statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Write the markdown catalog from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

fn parse_mode(value: &str) -> Result<CollectionMode, String> {
    CollectionMode::from_str_opt(value)
        .ok_or_else(|| format!("unknown mode '{}' (expected surface, detailed or new)", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &sweep_options(&cli, &config))
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_summary {
        handle_export_summary(&config)
    } else {
        let options = sweep_options(&cli, &config);
        handle_sweep(config, config_hash, &options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("college_sweep=info,warn"),
            1 => EnvFilter::new("college_sweep=debug,info"),
            2 => EnvFilter::new("college_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges the command line over the configured defaults
fn sweep_options(cli: &Cli, config: &Config) -> SweepOptions {
    let mut options = SweepOptions::from_config(config);

    if let Some(start_page) = cli.start_page {
        options.start_page = start_page;
    }
    options.bound = match (cli.end_page, cli.quantity) {
        (Some(end_page), _) => PageBound::EndPage(end_page),
        (None, Some(quantity)) => PageBound::Quantity(quantity),
        (None, None) => PageBound::Unbounded,
    };
    if let Some(mode) = cli.mode {
        options.mode = mode;
    }
    if cli.prune {
        options.prune = true;
    } else if cli.keep_stale {
        options.prune = false;
    }

    options
}

/// Handles the --dry-run mode: validates config and options and shows the plan
fn handle_dry_run(config: &Config, options: &SweepOptions) -> anyhow::Result<()> {
    options.validate()?;

    println!("=== College-Sweep Dry Run ===\n");

    println!("Source:");
    println!(
        "  First listing page: {}",
        listing_url(&config.source, options.start_page)?
    );
    match options.bound {
        PageBound::Unbounded => println!("  Pages: {} to the last page", options.start_page),
        PageBound::EndPage(end) => println!("  Pages: {} to {}", options.start_page, end),
        PageBound::Quantity(quantity) => println!(
            "  Pages: {} starting at {}",
            quantity, options.start_page
        ),
    }

    println!("\nCollector:");
    println!("  Mode: {}", options.mode);
    println!(
        "  Detail batch size: {}",
        config.collector.detail_batch_size
    );
    println!(
        "  Max concurrent requests: {}",
        config.collector.max_concurrent_requests
    );
    println!(
        "  Stale colleges: {}",
        if options.prune { "deleted" } else { "kept" }
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: writes the markdown catalog
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting College Catalog ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let written = write_catalog_markdown(&storage, Path::new(&config.output.summary_path))
        .context("Failed to write markdown catalog")?;

    println!(
        "✓ {} colleges exported to: {}",
        written, config.output.summary_path
    );

    Ok(())
}

/// Handles the main sweep operation
async fn handle_sweep(
    config: Config,
    config_hash: String,
    options: &SweepOptions,
) -> anyhow::Result<()> {
    tracing::info!(
        "Sweeping {}{} (mode: {}, prune: {})",
        config.source.base_url,
        config.source.listing_path,
        options.mode,
        options.prune
    );

    match run_sweep(config, config_hash, options).await {
        Ok(summary) => {
            println!("{}", summary.summary_line());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sweep failed: {}", e);
            Err(e.into())
        }
    }
}
