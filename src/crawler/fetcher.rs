//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests of a sweep:
//! - Building the HTTP client with a descriptive user agent
//! - GET requests for listing and detail pages
//! - Error classification (transport vs. status)
//!
//! There is no retry logic; a failed request is reported to the caller.

use crate::config::UserAgentConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`fetch_html`]
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not complete (DNS, timeout, connection reset, body read)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status other than 200
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Formats the user agent string: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use college_sweep::config::UserAgentConfig;
/// use college_sweep::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CollegeSweep".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body as text
///
/// | Condition                     | Result                   |
/// |-------------------------------|--------------------------|
/// | 200                           | `Ok(body)`               |
/// | any other status              | `FetchError::Status`     |
/// | DNS, connect, timeout, reset  | `FetchError::Transport`  |
/// | body could not be read        | `FetchError::Transport`  |
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })
}
