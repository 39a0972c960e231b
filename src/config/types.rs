use serde::Deserialize;
use std::fmt;

/// Main configuration structure for College-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    pub output: OutputConfig,
}

/// Where the college directory lives
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Scheme and host of the directory site, e.g. `https://www.princetonreview.com`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path (and fixed query) of the listing endpoint
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// How much data a sweep collects and whether it prunes stale rows
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Default collection depth, overridable from the command line
    #[serde(default)]
    pub mode: CollectionMode,

    /// Number of detail pages handled per batch
    #[serde(rename = "detail-batch-size", default = "default_detail_batch_size")]
    pub detail_batch_size: usize,

    /// Maximum number of detail fetches in flight inside one batch
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: usize,

    /// Delete colleges not re-observed by a completed sweep
    #[serde(rename = "prune-stale", default)]
    pub prune_stale: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mode: CollectionMode::default(),
            detail_batch_size: default_detail_batch_size(),
            max_concurrent_requests: default_max_concurrent_requests(),
            prune_stale: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown catalog export
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// Collection depth of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMode {
    /// Listing pages only: name, city, state, image and detail link
    #[default]
    Surface,

    /// Listing pages plus the detail page of every college seen
    Detailed,

    /// Listing pages plus the detail page of newly created colleges
    New,
}

impl CollectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::Detailed => "detailed",
            Self::New => "new",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "surface" => Some(Self::Surface),
            "detailed" => Some(Self::Detailed),
            "new" => Some(Self::New),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_detail_batch_size() -> usize {
    200
}

fn default_max_concurrent_requests() -> usize {
    8
}
