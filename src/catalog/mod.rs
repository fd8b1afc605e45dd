//! Read-only view of a crawl snapshot
//!
//! This module handles:
//! - Loading the CSV snapshot, tolerating a missing or partially written file
//! - Listing, filtering and searching records
//! - Aggregate statistics, overall and per category
//!
//! A [`Catalog`] is a plain value. Consumers that want fresh data after a
//! crawl simply load a new one.

mod query;

pub use query::{CatalogOverview, CategoryStats, ListQuery, SortField, SortOrder};

use crate::output::{read_snapshot_if_exists, BookRecord};
use crate::StoreResult;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

/// Snapshot records held in memory for querying
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<BookRecord>,
    skipped_rows: usize,
    loaded_at: DateTime<Utc>,
}

impl Catalog {
    /// Loads the snapshot at `path`
    ///
    /// A missing file gives an empty catalog. Rows that cannot be decoded,
    /// such as a truncated last line, are left out and counted.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let snapshot = read_snapshot_if_exists(path)?.unwrap_or_default();
        let skipped_rows = snapshot.skipped_rows();
        if skipped_rows > 0 {
            tracing::warn!(
                "Loaded {} with {} unreadable rows left out",
                path.display(),
                skipped_rows
            );
        }

        Ok(Self {
            records: snapshot.records,
            skipped_rows,
            loaded_at: Utc::now(),
        })
    }

    pub fn from_records(records: Vec<BookRecord>) -> Self {
        Self {
            records,
            skipped_rows: 0,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn get(&self, id: u64) -> Option<&BookRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Distinct categories in alphabetical order
    pub fn categories(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
