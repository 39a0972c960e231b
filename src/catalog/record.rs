//! College records and the persisted college entity

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// A college as extracted from one listing row
///
/// Only `name` is required; every other field is whatever the row carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollegeRecord {
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub site: Option<String>,
    pub image_url: Option<String>,
    pub college_page_url: Option<String>,
}

impl CollegeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Contact fields read from a college's own page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailRecord {
    pub address: Option<String>,
    pub phone: Option<String>,
    pub site: Option<String>,
}

impl DetailRecord {
    pub fn is_empty(&self) -> bool {
        self.address.is_none() && self.phone.is_none() && self.site.is_none()
    }
}

/// A college row of the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct College {
    /// Surrogate key, `None` until the college is first saved
    pub id: Option<i64>,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub site: Option<String>,
    pub image_url: Option<String>,
    pub college_page_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_deprecated: bool,
}

impl College {
    /// Creates an unsaved college with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            city: None,
            state: None,
            address: None,
            phone: None,
            site: None,
            image_url: None,
            college_page_url: None,
            created_at: Utc::now(),
            updated_at: None,
            is_deprecated: false,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the value currently stored for a field
    pub fn field(&self, field: CollegeField) -> Option<&str> {
        match field {
            CollegeField::Name => Some(self.name.as_str()),
            CollegeField::City => self.city.as_deref(),
            CollegeField::State => self.state.as_deref(),
            CollegeField::Address => self.address.as_deref(),
            CollegeField::Phone => self.phone.as_deref(),
            CollegeField::Site => self.site.as_deref(),
            CollegeField::ImageUrl => self.image_url.as_deref(),
            CollegeField::CollegePageUrl => self.college_page_url.as_deref(),
        }
    }
}

/// String columns of the catalog, with their length bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollegeField {
    Name,
    City,
    State,
    Address,
    Phone,
    Site,
    ImageUrl,
    CollegePageUrl,
}

impl CollegeField {
    pub const ALL: [CollegeField; 8] = [
        Self::Name,
        Self::City,
        Self::State,
        Self::Address,
        Self::Phone,
        Self::Site,
        Self::ImageUrl,
        Self::CollegePageUrl,
    ];

    /// Maximum length in characters
    pub fn max_len(&self) -> usize {
        match self {
            Self::State | Self::Phone => 50,
            _ => 255,
        }
    }

    /// Column name in the `colleges` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::State => "state",
            Self::Address => "address",
            Self::Phone => "phone",
            Self::Site => "site",
            Self::ImageUrl => "image_url",
            Self::CollegePageUrl => "college_page_url",
        }
    }

    /// Checks a value against this field's bound
    pub fn check(&self, value: &str) -> Result<(), FieldError> {
        let length = value.chars().count();
        if length > self.max_len() {
            return Err(FieldError {
                field: *self,
                length,
                max: self.max_len(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for CollegeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A field value that does not fit its column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is {length} characters long, limit is {max}")]
pub struct FieldError {
    pub field: CollegeField,
    pub length: usize,
    pub max: usize,
}

/// Truncates a string to at most `max` characters
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
