//! Sweep coordinator - main sweep orchestration logic
//!
//! This module contains the sweep loop that ties every stage together:
//! - Opening and closing the run row
//! - Paging through the listing sequentially
//! - Reconciling and saving each page
//! - Fetching detail pages in concurrent batches
//! - Deleting colleges that were not observed

use crate::catalog::{apply_detail, reconcile, College};
use crate::config::{CollectionMode, Config, SourceConfig};
use crate::crawler::parser::{has_next_page, parse_detail, parse_listing_rows, parse_max_page};
use crate::crawler::{build_http_client, fetch_html};
use crate::output::{Reporter, SweepEvent, SweepSummary, TracingReporter};
use crate::storage::{open_storage, RunStatus, Storage};
use crate::SweepError;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

/// How far a sweep pages past its start page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageBound {
    /// Until the listing runs out
    #[default]
    Unbounded,

    /// Up to and including this page
    EndPage(u32),

    /// This many pages, counting the start page
    Quantity(u32),
}

impl PageBound {
    /// Last page requested by the bound, `None` when unbounded
    pub fn end_page(&self, start_page: u32) -> Option<u32> {
        match *self {
            Self::Unbounded => None,
            Self::EndPage(end) => Some(end),
            Self::Quantity(quantity) => {
                Some(start_page.saturating_add(quantity.saturating_sub(1)))
            }
        }
    }
}

/// Parameters of a single sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOptions {
    pub start_page: u32,
    pub bound: PageBound,
    pub mode: CollectionMode,

    /// Delete colleges not observed during the sweep
    pub prune: bool,
}

impl SweepOptions {
    /// Options for a full sweep using the configured mode and pruning
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_page: 1,
            bound: PageBound::Unbounded,
            mode: config.collector.mode,
            prune: config.collector.prune_stale,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.start_page < 1 {
            return Err(SweepError::InvalidOptions(
                "start page must be at least 1".to_string(),
            ));
        }

        match self.bound {
            PageBound::EndPage(end) if end < self.start_page => {
                Err(SweepError::InvalidOptions(format!(
                    "end page {} is before start page {}",
                    end, self.start_page
                )))
            }
            PageBound::Quantity(0) => Err(SweepError::InvalidOptions(
                "quantity must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Builds the URL of a listing page
///
/// The page parameter is appended to any query the listing path already
/// carries.
///
/// # Example
///
/// ```
/// use college_sweep::config::SourceConfig;
/// use college_sweep::crawler::listing_url;
///
/// let source = SourceConfig {
///     base_url: "https://directory.example.com".to_string(),
///     listing_path: "/college-search?ceid=cp-1022984".to_string(),
///     page_param: "page".to_string(),
/// };
/// let url = listing_url(&source, 3).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://directory.example.com/college-search?ceid=cp-1022984&page=3"
/// );
/// ```
pub fn listing_url(source: &SourceConfig, page: u32) -> crate::Result<Url> {
    let base = Url::parse(&source.base_url)?;
    let mut url = base.join(&source.listing_path)?;
    url.query_pairs_mut()
        .append_pair(&source.page_param, &page.to_string());
    Ok(url)
}

/// Forwards events and counts rejected fields
struct FieldTally {
    inner: Arc<dyn Reporter>,
    rejected: AtomicU64,
}

impl FieldTally {
    fn new(inner: Arc<dyn Reporter>) -> Self {
        Self {
            inner,
            rejected: AtomicU64::new(0),
        }
    }

    fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl Reporter for FieldTally {
    fn report(&self, event: SweepEvent) {
        if matches!(event, SweepEvent::FieldRejected { .. }) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.report(event);
    }
}

/// Colleges seen during the current run, in first-seen order
#[derive(Debug, Default)]
struct Touched {
    order: Vec<i64>,
    seen: HashSet<i64>,
    created: HashSet<i64>,
}

impl Touched {
    /// Records a saved college, returns false if it was already seen
    fn insert(&mut self, id: i64, created: bool) -> bool {
        if created {
            self.created.insert(id);
        }
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    fn detail_targets(&self, mode: CollectionMode) -> Vec<i64> {
        match mode {
            CollectionMode::Surface => Vec::new(),
            CollectionMode::New => self
                .order
                .iter()
                .copied()
                .filter(|id| self.created.contains(id))
                .collect(),
            CollectionMode::Detailed => self.order.clone(),
        }
    }
}

/// Main sweep coordinator structure
pub struct Coordinator<S: Storage> {
    config: Config,
    base_url: Url,
    storage: S,
    client: Client,
    reporter: Arc<dyn Reporter>,
    config_hash: String,
}

impl<S: Storage> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `storage` - Catalog store, owned for the lifetime of the coordinator
    /// * `reporter` - Receives run events
    /// * `config_hash` - Hash of the configuration file, stored on run rows
    pub fn new(
        config: Config,
        storage: S,
        reporter: Arc<dyn Reporter>,
        config_hash: impl Into<String>,
    ) -> Result<Self, SweepError> {
        let base_url = Url::parse(&config.source.base_url)?;
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config,
            base_url,
            storage,
            client,
            reporter,
            config_hash: config_hash.into(),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs one sweep and records it in the run history
    ///
    /// A failure to fetch the first listing page, or any storage error,
    /// marks the run as failed and is returned. A fetch failure on a later
    /// page only ends paging; the run is then recorded as interrupted and
    /// nothing is deleted.
    pub async fn run(&mut self, options: &SweepOptions) -> Result<SweepSummary, SweepError> {
        options.validate()?;

        let run_id =
            self.storage
                .create_run(&self.config_hash, options.start_page, options.mode)?;
        tracing::info!(
            "Starting sweep run {} from page {} ({} mode)",
            run_id,
            options.start_page,
            options.mode
        );

        match self.sweep(run_id, options).await {
            Ok(summary) => {
                let status = if summary.interrupted {
                    RunStatus::Interrupted
                } else {
                    RunStatus::Completed
                };
                self.storage.complete_run(run_id, status, &summary)?;
                tracing::info!("Sweep run {} {}", run_id, status.to_db_string());
                Ok(summary)
            }
            Err(e) => {
                if let Err(store_err) = self.storage.fail_run(run_id, &e.to_string()) {
                    tracing::error!("Failed to record failure of run {}: {}", run_id, store_err);
                }
                Err(e)
            }
        }
    }

    async fn sweep(
        &mut self,
        run_id: i64,
        options: &SweepOptions,
    ) -> Result<SweepSummary, SweepError> {
        let tally = FieldTally::new(Arc::clone(&self.reporter));
        let mut summary = SweepSummary {
            run_id,
            ..SweepSummary::default()
        };
        let mut touched = Touched::default();

        let mut page = options.start_page;
        let mut url = listing_url(&self.config.source, page)?;
        let mut html = match fetch_html(&self.client, url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                tally.report(SweepEvent::PageFailed {
                    page,
                    url: url.to_string(),
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        // Only an explicit bound is clamped; unbounded paging follows Next
        let end_page = options.bound.end_page(options.start_page).map(|end| {
            let max_page = parse_max_page(&html);
            tracing::debug!("Listing shows {} pages, bound is {}", max_page, end);
            end.min(max_page).max(options.start_page)
        });

        if options.prune {
            let count = self.storage.mark_all_deprecated()?;
            tally.report(SweepEvent::DeprecatedMarked { count });
        }

        loop {
            let rows = self.process_listing_page(
                page,
                &url,
                &html,
                &tally,
                &mut touched,
                &mut summary,
            )?;
            summary.pages_visited += 1;

            if rows == 0 {
                tracing::info!("Page {} lists no colleges, stopping", page);
                break;
            }
            if !has_next_page(&html) {
                tracing::info!("Page {} is the last listing page", page);
                break;
            }
            if end_page.is_some_and(|end| page >= end) {
                break;
            }

            page += 1;
            url = listing_url(&self.config.source, page)?;
            match fetch_html(&self.client, url.as_str()).await {
                Ok(body) => html = body,
                Err(e) => {
                    tally.report(SweepEvent::PageFailed {
                        page,
                        url: url.to_string(),
                        error: e.to_string(),
                    });
                    summary.interrupted = true;
                    break;
                }
            }
        }

        let targets = touched.detail_targets(options.mode);
        if !targets.is_empty() {
            self.collect_details(&targets, &tally, &mut summary).await?;
        }

        if options.prune {
            if summary.interrupted {
                tally.report(SweepEvent::PruneSkipped {
                    reason: "listing paging was interrupted".to_string(),
                });
            } else if touched.order.is_empty() {
                tally.report(SweepEvent::PruneSkipped {
                    reason: "no colleges were observed".to_string(),
                });
            } else {
                let count = self.storage.delete_where_deprecated()?;
                tally.report(SweepEvent::StaleDeleted { count });
                summary.deleted = Some(count);
            }
        }

        summary.fields_rejected = tally.rejected();
        Ok(summary)
    }

    /// Parses, reconciles and saves one listing page
    ///
    /// # Returns
    ///
    /// The number of listing rows found, malformed ones included
    fn process_listing_page(
        &mut self,
        page: u32,
        url: &Url,
        html: &str,
        reporter: &dyn Reporter,
        touched: &mut Touched,
        summary: &mut SweepSummary,
    ) -> Result<usize, SweepError> {
        let rows = parse_listing_rows(html, &self.base_url);
        let row_count = rows.len();

        let mut records = Vec::with_capacity(row_count);
        for (row, parsed) in rows.into_iter().enumerate() {
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    summary.rows_skipped += 1;
                    reporter.report(SweepEvent::RowSkipped {
                        page,
                        row,
                        error: e.to_string(),
                    });
                }
            }
        }

        let reconciliation = reconcile(records, &self.storage, reporter)?;
        let created = reconciliation.created_count();
        let updated = reconciliation.updated_count();

        let mut colleges: Vec<College> = reconciliation
            .created
            .into_iter()
            .chain(reconciliation.updated)
            .collect();
        self.storage.save_all(&mut colleges)?;

        for (index, college) in colleges.iter().enumerate() {
            let Some(id) = college.id else { continue };
            let is_new = index < created;
            if touched.insert(id, is_new) {
                if is_new {
                    summary.added += 1;
                } else {
                    summary.updated += 1;
                }
            }
        }

        reporter.report(SweepEvent::PageCompleted {
            page,
            url: url.to_string(),
            created,
            updated,
        });

        Ok(row_count)
    }

    /// Fetches and applies detail pages for the given colleges
    ///
    /// Colleges are loaded and saved one batch at a time; fetches inside a
    /// batch run concurrently.
    async fn collect_details(
        &mut self,
        targets: &[i64],
        reporter: &dyn Reporter,
        summary: &mut SweepSummary,
    ) -> Result<(), SweepError> {
        let batch_size = self.config.collector.detail_batch_size.max(1);
        let concurrency = self.config.collector.max_concurrent_requests.max(1);

        for (batch, ids) in targets.chunks(batch_size).enumerate() {
            let mut colleges = Vec::with_capacity(ids.len());
            for &id in ids {
                let college = self.storage.get_college(id)?;
                if college.college_page_url.is_some() {
                    colleges.push(college);
                } else {
                    tracing::debug!("{} has no detail page, skipping", college.name);
                }
            }

            let requests: Vec<(usize, String)> = colleges
                .iter()
                .enumerate()
                .filter_map(|(index, college)| {
                    college.college_page_url.clone().map(|url| (index, url))
                })
                .collect();

            let client = &self.client;
            let responses: Vec<_> = stream::iter(requests)
                .map(|(index, url)| async move {
                    let result = fetch_html(client, &url).await;
                    (index, url, result)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            let mut fetched = vec![false; colleges.len()];
            let mut failed = 0;
            for (index, url, result) in responses {
                match result {
                    Ok(html) => {
                        let detail = parse_detail(&html);
                        apply_detail(&mut colleges[index], &detail, reporter);
                        fetched[index] = true;
                    }
                    Err(e) => {
                        failed += 1;
                        reporter.report(SweepEvent::DetailFailed {
                            college: colleges[index].name.clone(),
                            url,
                            error: e.to_string(),
                        });
                    }
                }
            }

            let mut changed: Vec<College> = colleges
                .into_iter()
                .zip(fetched)
                .filter_map(|(college, ok)| ok.then_some(college))
                .collect();
            self.storage.save_all(&mut changed)?;

            summary.details_fetched += changed.len() as u64;
            summary.details_failed += failed as u64;
            reporter.report(SweepEvent::DetailBatchCompleted {
                batch: batch + 1,
                fetched: changed.len(),
                failed,
            });
        }

        Ok(())
    }
}

/// Runs a sweep against the configured database
///
/// This is the entry point used by the binary: it opens the SQLite catalog
/// and reports run events through `tracing`.
pub async fn run_sweep(
    config: Config,
    config_hash: String,
    options: &SweepOptions,
) -> crate::Result<SweepSummary> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let mut coordinator = Coordinator::new(config, storage, Arc::new(TracingReporter), config_hash)?;
    coordinator.run(options).await
}
