//! Integration tests for the sweep
//!
//! These tests use wiremock to serve a small college directory and run
//! complete sweeps against it.

use college_sweep::catalog::College;
use college_sweep::config::{
    CollectionMode, CollectorConfig, Config, OutputConfig, SourceConfig, UserAgentConfig,
};
use college_sweep::crawler::{run_sweep, Coordinator, PageBound, SweepOptions};
use college_sweep::output::{CollectingReporter, SweepEvent};
use college_sweep::storage::{RunStatus, SqliteStorage, Storage};
use college_sweep::SweepError;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGINATION_FIRST: &str = r#"<ul class="pagination">
    <li class="active"><span>1</span></li>
    <li><a href="?page=2">2</a></li>
    <li><a href="?page=2">Next &raquo;</a></li>
</ul>"#;

const PAGINATION_LAST: &str = r#"<ul class="pagination">
    <li><a href="?page=1">&laquo; Previous</a></li>
    <li><a href="?page=1">1</a></li>
    <li class="active"><span>2</span></li>
</ul>"#;

fn test_config(base_url: &str, mode: CollectionMode) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            listing_path: "/colleges".to_string(),
            page_param: "page".to_string(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        collector: CollectorConfig {
            mode,
            detail_batch_size: 1,
            max_concurrent_requests: 2,
            prune_stale: false,
        },
        output: OutputConfig {
            database_path: "./unused.db".to_string(),
            summary_path: "./unused.md".to_string(),
        },
    }
}

fn options(mode: CollectionMode, prune: bool) -> SweepOptions {
    SweepOptions {
        start_page: 1,
        bound: PageBound::Unbounded,
        mode,
        prune,
    }
}

fn listing_row(name: &str, slug: &str, location: &str) -> String {
    format!(
        r#"<div class="row">
             <div class="col-xs-12 vertical-padding">
               <img class="school-image" src="/images/{slug}.jpg" alt="{name}">
               <h2><a href="/college/{slug}">{name}</a></h2>
               <div class="location">{location}</div>
             </div>
           </div>"#
    )
}

fn listing_page(rows: &[String], pagination: &str) -> String {
    format!(
        "<html><body><div class=\"results\">{}</div>{}</body></html>",
        rows.join("\n"),
        pagination
    )
}

fn detail_page(street: &str, phone: &str, site: &str) -> String {
    format!(
        r#"<html><body>
             <div itemprop="address">
               <span>{street}</span>
               <a href="{site}">Website</a>
             </div>
             <div class="school-contacts">
               <div class="col-sm-6">
                 <div class="row"><div>Phone</div><div>{phone}</div></div>
               </div>
             </div>
           </body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves Harvard on page 1 (with Next) and Yale on page 2 (last page)
async fn mount_two_pages(server: &MockServer) {
    mount_listing(
        server,
        "1",
        listing_page(
            &[listing_row("Harvard College", "harvard-college-1022984", "Cambridge, MA")],
            PAGINATION_FIRST,
        ),
    )
    .await;
    mount_listing(
        server,
        "2",
        listing_page(
            &[listing_row("Yale University", "yale-university-1023192", "New Haven, CT")],
            PAGINATION_LAST,
        ),
    )
    .await;
}

fn coordinator(
    config: Config,
    storage: SqliteStorage,
) -> (Coordinator<SqliteStorage>, Arc<CollectingReporter>) {
    let reporter = Arc::new(CollectingReporter::new());
    let coordinator = Coordinator::new(config, storage, reporter.clone(), "test-hash")
        .expect("Failed to create coordinator");
    (coordinator, reporter)
}

fn seeded_storage(names: &[&str]) -> SqliteStorage {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let mut colleges: Vec<College> = names.iter().map(|name| College::new(*name)).collect();
    storage.save_all(&mut colleges).unwrap();
    storage
}

#[tokio::test]
async fn test_two_page_sweep_on_empty_catalog() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.added, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted, Some(0));
    assert!(!summary.interrupted);
    assert_eq!(
        summary.summary_line(),
        "Total colleges added: 2, updated: 0, deleted: 0"
    );

    let colleges = coordinator.storage().find_all().unwrap();
    assert_eq!(colleges.len(), 2);

    let harvard = &colleges[0];
    assert_eq!(harvard.name, "Harvard College");
    assert_eq!(harvard.city.as_deref(), Some("Cambridge"));
    assert_eq!(harvard.state.as_deref(), Some("MA"));
    assert_eq!(
        harvard.college_page_url.as_deref(),
        Some(format!("{}/college/harvard-college-1022984", server.uri()).as_str())
    );
    assert!(harvard.address.is_none());
    assert!(!harvard.is_deprecated);

    let yale = &colleges[1];
    assert_eq!(yale.name, "Yale University");
    assert_eq!(yale.city.as_deref(), Some("New Haven"));
    assert_eq!(yale.state.as_deref(), Some("CT"));

    let run = coordinator.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.added, 2);
    assert_eq!(run.deleted, Some(0));
}

#[tokio::test]
async fn test_prune_deletes_unobserved_colleges() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let storage = seeded_storage(&["Harvard College", "Closed College"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, reporter) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, Some(1));

    let colleges = coordinator.storage().find_all().unwrap();
    let names: Vec<&str> = colleges.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Harvard College", "Yale University"]);
    assert!(colleges.iter().all(|c| !c.is_deprecated));
    assert_eq!(colleges[0].city.as_deref(), Some("Cambridge"));
    assert!(colleges[0].updated_at.is_some());

    let events = reporter.events();
    assert!(events.contains(&SweepEvent::DeprecatedMarked { count: 2 }));
    assert!(events.contains(&SweepEvent::StaleDeleted { count: 1 }));
}

#[tokio::test]
async fn test_without_prune_nothing_is_deprecated_or_deleted() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let storage = seeded_storage(&["Closed College"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::Surface, false))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.deleted, None);
    assert!(summary.summary_line().ends_with("deleted: skipped"));
    assert_eq!(coordinator.storage().count_colleges().unwrap(), 3);
    assert_eq!(coordinator.storage().count_deprecated().unwrap(), 0);
}

#[tokio::test]
async fn test_first_page_failure_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let storage = seeded_storage(&["Harvard College"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, storage);

    let result = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await;

    assert!(matches!(result, Err(SweepError::Fetch(_))));
    assert_eq!(coordinator.storage().count_colleges().unwrap(), 1);
    assert_eq!(coordinator.storage().count_deprecated().unwrap(), 0);

    let run = coordinator.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.is_some());
}

#[tokio::test]
async fn test_later_page_failure_skips_pruning() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "1",
        listing_page(
            &[listing_row("Harvard College", "harvard-college-1022984", "Cambridge, MA")],
            PAGINATION_FIRST,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let storage = seeded_storage(&["Yale University"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, reporter) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert!(summary.interrupted);
    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.deleted, None);

    // Yale was not observed but survives the interrupted sweep
    assert_eq!(coordinator.storage().count_colleges().unwrap(), 2);

    let run = coordinator.storage().get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);

    let events = reporter.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SweepEvent::PageFailed { page: 2, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, SweepEvent::PruneSkipped { .. })));
}

#[tokio::test]
async fn test_detailed_mode_collects_contacts() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    Mock::given(method("GET"))
        .and(path("/college/harvard-college-1022984"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "Massachusetts Hall",
            "(617) 555-0100",
            "https://www.harvard.edu",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/college/yale-university-1023192"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "Woodbridge Hall",
            "(203) 555-0200",
            "https://www.yale.edu",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), CollectionMode::Detailed);
    let (mut coordinator, reporter) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let summary = coordinator
        .run(&options(CollectionMode::Detailed, false))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.details_fetched, 2);
    assert_eq!(summary.details_failed, 0);

    let colleges = coordinator.storage().find_all().unwrap();
    assert_eq!(colleges[0].phone.as_deref(), Some("(617) 555-0100"));
    assert_eq!(colleges[0].address.as_deref(), Some("Massachusetts Hall"));
    assert_eq!(colleges[0].site.as_deref(), Some("https://www.harvard.edu"));
    assert_eq!(colleges[1].phone.as_deref(), Some("(203) 555-0200"));

    // One college per batch
    let batches = reporter
        .events()
        .into_iter()
        .filter(|e| matches!(e, SweepEvent::DetailBatchCompleted { .. }))
        .count();
    assert_eq!(batches, 2);
}

#[tokio::test]
async fn test_new_mode_only_visits_created_colleges() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    Mock::given(method("GET"))
        .and(path("/college/harvard-college-1022984"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "Massachusetts Hall",
            "(617) 555-0100",
            "https://www.harvard.edu",
        )))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/college/yale-university-1023192"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "Woodbridge Hall",
            "(203) 555-0200",
            "https://www.yale.edu",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let storage = seeded_storage(&["Harvard College"]);
    let config = test_config(&server.uri(), CollectionMode::New);
    let (mut coordinator, _) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::New, false))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.details_fetched, 1);

    let colleges = coordinator.storage().find_all().unwrap();
    assert!(colleges[0].phone.is_none());
    assert_eq!(colleges[1].phone.as_deref(), Some("(203) 555-0200"));
}

#[tokio::test]
async fn test_failed_detail_keeps_surface_data() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    Mock::given(method("GET"))
        .and(path("/college/harvard-college-1022984"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/college/yale-university-1023192"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
            "Woodbridge Hall",
            "(203) 555-0200",
            "https://www.yale.edu",
        )))
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), CollectionMode::Detailed);
    let (mut coordinator, reporter) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let summary = coordinator
        .run(&options(CollectionMode::Detailed, false))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.details_fetched, 1);
    assert_eq!(summary.details_failed, 1);

    let harvard = &coordinator.storage().find_all().unwrap()[0];
    assert_eq!(harvard.city.as_deref(), Some("Cambridge"));
    assert!(harvard.phone.is_none());

    assert!(reporter.events().iter().any(|e| matches!(
        e,
        SweepEvent::DetailFailed { college, .. } if college == "Harvard College"
    )));
}

#[tokio::test]
async fn test_quantity_limits_pages() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "1",
        listing_page(
            &[listing_row("Harvard College", "harvard-college-1022984", "Cambridge, MA")],
            PAGINATION_FIRST,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], "")))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let mut sweep = options(CollectionMode::Surface, false);
    sweep.bound = PageBound::Quantity(1);
    let summary = coordinator.run(&sweep).await.expect("Sweep failed");

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.added, 1);
}

#[tokio::test]
async fn test_empty_page_ends_paging_and_bad_rows_are_reported() {
    let server = MockServer::start().await;
    let bad_row = r#"<div class="row"><div class="vertical-padding"><div class="location">Nowhere, ZZ</div></div></div>"#
        .to_string();
    mount_listing(
        &server,
        "1",
        listing_page(
            &[
                bad_row,
                listing_row("Harvard College", "harvard-college-1022984", "Cambridge, MA"),
            ],
            PAGINATION_FIRST,
        ),
    )
    .await;
    mount_listing(&server, "2", listing_page(&[], PAGINATION_FIRST)).await;
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, reporter) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.added, 1);
    assert_eq!(summary.rows_skipped, 1);
    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, SweepEvent::RowSkipped { page: 1, row: 0, .. })));
}

#[tokio::test]
async fn test_invalid_options_do_not_open_a_run() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let mut sweep = options(CollectionMode::Surface, false);
    sweep.start_page = 4;
    sweep.bound = PageBound::EndPage(2);

    let result = coordinator.run(&sweep).await;

    assert!(matches!(result, Err(SweepError::InvalidOptions(_))));
    assert!(coordinator.storage().get_latest_run().unwrap().is_none());
}

#[tokio::test]
async fn test_run_sweep_persists_to_database_file() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("colleges.db");
    let mut config = test_config(&server.uri(), CollectionMode::Surface);
    config.output.database_path = db_path.to_string_lossy().to_string();

    let summary = run_sweep(config, "file-hash".to_string(), &options(CollectionMode::Surface, false))
        .await
        .expect("Sweep failed");
    assert_eq!(summary.added, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_colleges().unwrap(), 2);
    let runs = storage.list_runs(10).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].config_hash, "file-hash");
}

#[tokio::test]
async fn test_next_link_without_page_numbers_keeps_paging() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "1",
        listing_page(
            &[listing_row("Harvard College", "harvard-college-1022984", "Cambridge, MA")],
            r#"<ul class="pagination"><li><a href="?page=2">Next</a></li></ul>"#,
        ),
    )
    .await;
    mount_listing(
        &server,
        "2",
        listing_page(
            &[listing_row("Yale University", "yale-university-1023192", "New Haven, CT")],
            "",
        ),
    )
    .await;

    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.added, 2);
    assert_eq!(summary.deleted, Some(0));

    let names: Vec<String> = coordinator
        .storage()
        .find_all()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Harvard College", "Yale University"]);
}

#[tokio::test]
async fn test_windowed_pagination_with_prune_keeps_later_pages() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "1",
        listing_page(
            &[listing_row("A College", "a-college", "Albany, NY")],
            r#"<ul class="pagination"><li><span>1</span></li><li><a href="?page=2">2</a></li><li><a href="?page=2">Next</a></li></ul>"#,
        ),
    )
    .await;
    mount_listing(
        &server,
        "2",
        listing_page(
            &[listing_row("B College", "b-college", "Boston, MA")],
            r#"<ul class="pagination"><li><a href="?page=1">1</a></li><li><span>2</span></li><li><a href="?page=3">3</a></li><li><a href="?page=3">Next</a></li></ul>"#,
        ),
    )
    .await;
    mount_listing(
        &server,
        "3",
        listing_page(
            &[listing_row("C College", "c-college", "Chicago, IL")],
            r#"<ul class="pagination"><li><a href="?page=2">Previous</a></li><li><span>3</span></li></ul>"#,
        ),
    )
    .await;

    let storage = seeded_storage(&["A College", "B College", "C College"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.updated, 3);
    assert_eq!(summary.deleted, Some(0));
    assert_eq!(coordinator.storage().count_colleges().unwrap(), 3);
    assert_eq!(coordinator.storage().count_deprecated().unwrap(), 0);
}

#[tokio::test]
async fn test_explicit_end_page_is_clamped_to_listed_pages() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    Mock::given(method("GET"))
        .and(path("/colleges"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, _) = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let mut sweep = options(CollectionMode::Surface, false);
    sweep.bound = PageBound::EndPage(10);
    let summary = coordinator.run(&sweep).await.expect("Sweep failed");

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.added, 2);
}

#[tokio::test]
async fn test_empty_first_page_keeps_catalog() {
    let server = MockServer::start().await;
    mount_listing(&server, "1", listing_page(&[], "")).await;

    let storage = seeded_storage(&["Harvard College", "Yale University"]);
    let config = test_config(&server.uri(), CollectionMode::Surface);
    let (mut coordinator, reporter) = coordinator(config, storage);

    let summary = coordinator
        .run(&options(CollectionMode::Surface, true))
        .await
        .expect("Sweep failed");

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.deleted, None);
    assert_eq!(coordinator.storage().count_colleges().unwrap(), 2);
    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, SweepEvent::PruneSkipped { .. })));
}
