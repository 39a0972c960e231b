//! HTML parser for listing and detail pages
//!
//! This module extracts:
//! - College summary records from listing pages
//! - Contact details (address, phone, site) from a college's own page
//! - Pagination state (last page number, presence of a Next control)

use crate::catalog::{CollegeRecord, DetailRecord};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Errors for a single listing row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

static LISTING_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".row .vertical-padding").expect("invalid selector: row"));
static ROW_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("invalid selector: heading"));
static ROW_LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".location").expect("invalid selector: location"));
static ROW_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: link"));
static IMAGE_LARGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img.school-image-large[src]").expect("invalid selector: large image")
});
static IMAGE_DEFAULT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img.school-image[src]").expect("invalid selector: default image")
});
static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.pagination").expect("invalid selector: pagination"));
static PAGINATION_ITEM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.pagination > li").expect("invalid selector: pagination item")
});
static ADDRESS_SPAN: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[itemprop="address"] > span"#).expect("invalid selector: address")
});
static ADDRESS_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[itemprop="address"] > a[href]"#).expect("invalid selector: site")
});
static CONTACTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".school-contacts").expect("invalid selector: contacts"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Resolves an href or src against the base URL
///
/// Protocol-relative values take the base scheme. Only HTTP(S) results are
/// accepted.
fn resolve_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("javascript:") || value.starts_with("data:") {
        return None;
    }

    let resolved = base_url.join(value).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Splits a "City, ST" location on the first comma
fn split_location(text: &str) -> (Option<String>, Option<String>) {
    match text.split_once(',') {
        Some((city, state)) => (
            non_empty(city.trim().to_string()),
            non_empty(state.trim().to_string()),
        ),
        None => (non_empty(text.trim().to_string()), None),
    }
}

fn parse_listing_row(row: ElementRef, base_url: &Url) -> Result<CollegeRecord, ParseError> {
    let name = row
        .select(&ROW_HEADING)
        .next()
        .map(|heading| normalize_whitespace(&elem_text(heading)))
        .and_then(non_empty)
        .ok_or_else(|| ParseError::MissingField("name".to_string()))?;

    let mut record = CollegeRecord::new(name);

    if let Some(location) = row.select(&ROW_LOCATION).next() {
        let (city, state) = split_location(&normalize_whitespace(&elem_text(location)));
        record.city = city;
        record.state = state;
    }

    record.image_url = row
        .select(&IMAGE_LARGE)
        .next()
        .or_else(|| row.select(&IMAGE_DEFAULT).next())
        .and_then(|image| image.value().attr("src"))
        .and_then(|src| resolve_url(src, base_url));

    if let Some(href) = row
        .select(&ROW_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
    {
        let url =
            resolve_url(href, base_url).ok_or_else(|| ParseError::InvalidUrl(href.to_string()))?;
        record.college_page_url = Some(url);
    }

    Ok(record)
}

/// Parses every listing row, keeping per-row failures
///
/// # Arguments
///
/// * `html` - Listing page markup
/// * `base_url` - Directory base URL used to resolve detail links and images
///
/// # Returns
///
/// One entry per matched row, in page order. An empty vector means the page
/// has no listing rows.
pub fn parse_listing_rows(html: &str, base_url: &Url) -> Vec<Result<CollegeRecord, ParseError>> {
    let document = Html::parse_document(html);
    document
        .select(&LISTING_ROW)
        .map(|row| parse_listing_row(row, base_url))
        .collect()
}

/// Parses the college summaries of a listing page
///
/// Malformed rows are logged and dropped.
///
/// # Example
///
/// ```
/// use college_sweep::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<div class="row"><div class="vertical-padding">
///     <h2><a href="/college/yale">Yale University</a></h2>
///     <div class="location">New Haven, CT</div>
/// </div></div>"#;
/// let base = Url::parse("https://directory.example.com").unwrap();
/// let records = parse_listing(html, &base);
/// assert_eq!(records[0].state.as_deref(), Some("CT"));
/// ```
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<CollegeRecord> {
    parse_listing_rows(html, base_url)
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match row {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping listing row {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Parses the contact block of a college page
///
/// - address: space-joined `span` children of `div[itemprop="address"]`
/// - site: `href` of the `a` child of the same container
/// - phone: second cell of the contacts row whose first cell reads `Phone`
///
/// Anything missing is left as `None`.
pub fn parse_detail(html: &str) -> DetailRecord {
    let document = Html::parse_document(html);

    let address = document
        .select(&ADDRESS_SPAN)
        .map(|span| normalize_whitespace(&elem_text(span)))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let site = document
        .select(&ADDRESS_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .map(|href| href.trim().to_string())
        .and_then(non_empty);

    DetailRecord {
        address: non_empty(address),
        phone: extract_phone(&document),
        site,
    }
}

fn extract_phone(document: &Html) -> Option<String> {
    let contacts = document.select(&CONTACTS).next()?;
    let block = child_elements(contacts).next()?;

    // A later Phone row overrides an earlier one
    child_elements(block)
        .filter(|row| row.value().classes().any(|class| class == "row"))
        .filter_map(|row| {
            let mut cells = child_elements(row);
            let label = normalize_whitespace(&elem_text(cells.next()?));
            if label != "Phone" {
                return None;
            }
            non_empty(normalize_whitespace(&elem_text(cells.next()?)))
        })
        .last()
}

/// Reads the last page number from the pagination control
///
/// The text nodes of the control are joined with spaces, split on runs of
/// non-digits and the final number is taken. Returns 1 when there is no
/// control or it holds no number.
pub fn parse_max_page(html: &str) -> u32 {
    let document = Html::parse_document(html);
    let Some(pagination) = document.select(&PAGINATION).next() else {
        return 1;
    };

    // Adjacent items in minified markup must not merge into one number
    pagination
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .last()
        .and_then(|part| part.parse::<u32>().ok())
        .map(|page| page.max(1))
        .unwrap_or(1)
}

/// Returns true when the pagination control lists a Next link
pub fn has_next_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    document.select(&PAGINATION_ITEM).any(|item| {
        child_elements(item).any(|child| elem_text(child).contains("Next"))
    })
}
