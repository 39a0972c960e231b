//! Reconciliation of scraped records against the catalog
//!
//! Records are matched to catalog rows by exact name. Fields present in a
//! record overwrite the stored value when they fit their column; fields the
//! record does not carry are left alone.

use crate::catalog::record::{truncate_chars, College, CollegeField, CollegeRecord, DetailRecord};
use crate::output::{Reporter, SweepEvent};
use crate::storage::{Storage, StorageResult};
use std::collections::HashMap;

/// Colleges touched by one batch of records, split by whether they existed
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub created: Vec<College>,
    pub updated: Vec<College>,
}

impl Reconciliation {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

/// Matches records to catalog rows and applies their fields
///
/// Nothing is written; the caller persists the returned colleges.
///
/// # Arguments
///
/// * `records` - Records parsed from one listing page
/// * `storage` - Catalog used for name lookups
/// * `reporter` - Receives one event per rejected field
pub fn reconcile(
    records: Vec<CollegeRecord>,
    storage: &dyn Storage,
    reporter: &dyn Reporter,
) -> StorageResult<Reconciliation> {
    let mut entries: Vec<(College, bool)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = truncate_chars(record.name.trim(), CollegeField::Name.max_len());
        if name.is_empty() {
            continue;
        }

        let position = match positions.get(&name) {
            Some(&position) => position,
            None => {
                let entry = match storage.find_by_name(&name)? {
                    Some(existing) => (existing, false),
                    None => (College::new(name.clone()), true),
                };
                entries.push(entry);
                positions.insert(name, entries.len() - 1);
                entries.len() - 1
            }
        };

        apply_record(&mut entries[position].0, &record, reporter);
    }

    let mut reconciliation = Reconciliation::default();
    for (college, is_new) in entries {
        if is_new {
            reconciliation.created.push(college);
        } else {
            reconciliation.updated.push(college);
        }
    }

    Ok(reconciliation)
}

/// Overwrites the college's surface fields with the record's values
///
/// Marks the college as current.
pub fn apply_record(college: &mut College, record: &CollegeRecord, reporter: &dyn Reporter) {
    if let Some(v) = accept(&college.name, CollegeField::City, &record.city, reporter) {
        college.city = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::State, &record.state, reporter) {
        college.state = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::Address, &record.address, reporter) {
        college.address = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::Phone, &record.phone, reporter) {
        college.phone = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::Site, &record.site, reporter) {
        college.site = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::ImageUrl, &record.image_url, reporter) {
        college.image_url = Some(v);
    }
    if let Some(v) = accept(
        &college.name,
        CollegeField::CollegePageUrl,
        &record.college_page_url,
        reporter,
    ) {
        college.college_page_url = Some(v);
    }

    college.is_deprecated = false;
}

/// Overwrites the college's contact fields with a detail page's values
pub fn apply_detail(college: &mut College, detail: &DetailRecord, reporter: &dyn Reporter) {
    if let Some(v) = accept(&college.name, CollegeField::Address, &detail.address, reporter) {
        college.address = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::Phone, &detail.phone, reporter) {
        college.phone = Some(v);
    }
    if let Some(v) = accept(&college.name, CollegeField::Site, &detail.site, reporter) {
        college.site = Some(v);
    }
}

fn accept(
    college: &str,
    field: CollegeField,
    value: &Option<String>,
    reporter: &dyn Reporter,
) -> Option<String> {
    let value = value.as_ref()?;
    match field.check(value) {
        Ok(()) => Some(value.clone()),
        Err(error) => {
            reporter.report(SweepEvent::FieldRejected {
                college: college.to_string(),
                error,
            });
            None
        }
    }
}
