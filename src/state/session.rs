use crate::crawler::ParsedBook;
use crate::output::{BookRecord, RetainedRow, SnapshotLoad};
use std::collections::HashSet;
use std::time::Duration;

/// How a category's crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// Every listing page was walked
    Completed,

    /// A listing page could not be fetched; the rest of the category was skipped
    Failed,

    /// The item limit was reached inside this category
    LimitReached,
}

/// Per-category tally kept for the run summary
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub name: String,
    pub added: u64,
    pub elapsed: Duration,
    pub outcome: CategoryOutcome,
}

/// What was reconstructed from a previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeLoad {
    /// Records taken over from the snapshot
    pub loaded: usize,

    /// Rows kept verbatim because they could not be taken over as records
    pub retained: usize,

    /// Id the next new record will receive
    pub next_id: u64,
}

/// Mutable state of one crawl run
///
/// Owns the ordered record set, the seen detail URLs and the counters. The
/// coordinator holds exactly one of these for the duration of a run.
#[derive(Debug, Clone)]
pub struct CrawlSession {
    records: Vec<BookRecord>,
    seen: HashSet<String>,
    next_id: u64,
    successes: u64,
    failures: u64,
    categories: Vec<CategorySummary>,
    retained: Vec<RetainedRow>,
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlSession {
    /// Creates an empty session; the first record gets id 1
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            seen: HashSet::new(),
            next_id: 1,
            successes: 0,
            failures: 0,
            categories: Vec::new(),
            retained: Vec::new(),
        }
    }

    /// Adopts a previous snapshot, keeping its rows in their original order
    ///
    /// Every detail URL in the file is marked seen and the id counter moves
    /// past the highest id in the file, retained rows included, so no id is
    /// handed out twice. Retained rows are written back unchanged on every save.
    pub fn resume_from(&mut self, snapshot: SnapshotLoad) -> ResumeLoad {
        let loaded = snapshot.records.len();

        for record in snapshot.records {
            self.seen.insert(record.detail_url.clone());
            self.next_id = self.next_id.max(record.id.saturating_add(1));
            self.records.push(record);
        }
        for row in &snapshot.retained {
            if let Some(id) = row.id {
                self.next_id = self.next_id.max(id.saturating_add(1));
            }
            if let Some(url) = row.detail_url() {
                self.seen.insert(url.to_string());
            }
        }
        self.retained = snapshot.retained;

        ResumeLoad {
            loaded,
            retained: self.retained.len(),
            next_id: self.next_id,
        }
    }

    /// Returns true if this detail URL is already in the record set
    pub fn is_seen(&self, detail_url: &str) -> bool {
        self.seen.contains(detail_url)
    }

    /// Turns a parsed page into a record with the next id and appends it
    pub fn record_success(&mut self, parsed: ParsedBook) -> &BookRecord {
        let id = self.next_id;
        self.next_id += 1;
        self.successes += 1;
        self.seen.insert(parsed.detail_url.clone());
        self.records.push(BookRecord::from_parsed(id, parsed));
        &self.records[self.records.len() - 1]
    }

    /// Counts one lost item or one lost category
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn finish_category(&mut self, summary: CategorySummary) {
        self.categories.push(summary);
    }

    /// Returns true once this run's successes reach `limit`
    pub fn limit_reached(&self, limit: Option<u64>) -> bool {
        limit.is_some_and(|limit| self.successes >= limit)
    }

    /// Returns true when `every` is non-zero and successes just hit a multiple of it
    pub fn at_interval(&self, every: u64) -> bool {
        every > 0 && self.successes > 0 && self.successes % every == 0
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    /// Snapshot rows carried through without being interpreted
    pub fn retained_rows(&self) -> &[RetainedRow] {
        &self.retained
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Products parsed successfully in this run
    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn categories(&self) -> &[CategorySummary] {
        &self.categories
    }

    /// Names of categories abandoned because a listing page failed
    pub fn failed_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.outcome == CategoryOutcome::Failed)
            .map(|c| c.name.clone())
            .collect()
    }
}
