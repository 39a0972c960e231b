//! Crawler module for listing and detail page collection
//!
//! This module contains the core sweep logic, including:
//! - HTTP fetching with a descriptive user agent
//! - HTML parsing of listing rows, contact details and pagination
//! - Overall sweep coordination

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{listing_url, run_sweep, Coordinator, PageBound, SweepOptions};
pub use fetcher::{build_http_client, fetch_html, user_agent_string, FetchError};
pub use parser::{
    has_next_page, parse_detail, parse_listing, parse_listing_rows, parse_max_page, ParseError,
};
