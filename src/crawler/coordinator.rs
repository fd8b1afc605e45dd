//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop, including:
//! - Reloading a previous snapshot when resuming
//! - Fetching the category index
//! - Walking every category's listing pages and product pages
//! - Periodic checkpoints and the final flush
//!
//! Failures are contained at the narrowest level that makes sense. A bad
//! product page costs one item, a broken listing page costs the rest of its
//! category, and only an unreachable category index ends the run.

use crate::config::Config;
use crate::crawler::parser::{parse_category_index, parse_detail, parse_listing, Category};
use crate::crawler::{Fetcher, ParsedBook};
use crate::output::{read_snapshot_if_exists, write_snapshot_retaining};
use crate::state::{CategoryOutcome, CategorySummary, CrawlSession, RunPhase};
use crate::{CrawlError, FetchError, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

/// Final tally of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Records in the written snapshot, resumed ones included
    pub total_records: usize,

    /// Products parsed in this run
    pub successes: u64,

    /// Lost products plus abandoned categories
    pub failures: u64,

    /// Categories listed by the index
    pub categories_found: usize,

    /// Categories abandoned because a listing page failed
    pub failed_categories: Vec<String>,

    /// True if the item limit ended the run early
    pub limit_reached: bool,

    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    fetcher: Fetcher,
    session: CrawlSession,
    phase: RunPhase,
    output_path: PathBuf,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Nothing is read or fetched yet; that happens in [`Coordinator::run`].
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config.crawler, &config.user_agent)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Creates a coordinator around an already configured fetcher
    pub fn with_fetcher(config: Config, fetcher: Fetcher) -> Self {
        let output_path = PathBuf::from(&config.output.csv_path);
        Self {
            config,
            fetcher,
            session: CrawlSession::new(),
            phase: RunPhase::Init,
            output_path,
        }
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Runs the crawl to completion
    ///
    /// This is the core crawling logic that:
    /// 1. Reloads the previous snapshot when resuming
    /// 2. Fetches the category index (the only fatal step)
    /// 3. Crawls each category in listed order
    /// 4. Writes the final snapshot and returns the run's tally
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let start_time = Instant::now();

        if self.config.crawler.resume {
            self.transition(RunPhase::LoadResume)?;
            self.load_resume();
        }

        self.transition(RunPhase::FetchIndex)?;
        let categories = match self.fetch_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                self.transition(RunPhase::Aborted)?;
                tracing::error!("Could not fetch the category index: {}", e);
                return Err(e);
            }
        };
        if categories.is_empty() {
            tracing::warn!(
                "No categories found at {}; the page layout may have changed",
                self.config.source.base_url
            );
        } else {
            tracing::info!("Found {} categories", categories.len());
        }

        self.transition(RunPhase::Crawling)?;
        let limit_reached = self.crawl_categories(&categories).await;

        self.transition(RunPhase::FinalFlush)?;
        if let Err(e) = write_snapshot_retaining(
            &self.output_path,
            self.session.records(),
            self.session.retained_rows(),
        ) {
            self.transition(RunPhase::Aborted)?;
            tracing::error!(
                "Could not write {} ({} records lost): {}",
                self.output_path.display(),
                self.session.records().len(),
                e
            );
            return Err(e.into());
        }
        self.transition(RunPhase::Done)?;

        let report = CrawlReport {
            total_records: self.session.records().len(),
            successes: self.session.successes(),
            failures: self.session.failures(),
            categories_found: categories.len(),
            failed_categories: self.session.failed_categories(),
            limit_reached,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Saved {} books to {} (successes={}, failures={}, elapsed={:.2}s)",
            report.total_records,
            self.output_path.display(),
            report.successes,
            report.failures,
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }

    /// Adopts the records of an existing snapshot
    ///
    /// Rows that cannot be adopted still reserve their id and URL and are
    /// written back unchanged.
    ///
    /// An unreadable snapshot is logged and the run continues from scratch.
    fn load_resume(&mut self) {
        match read_snapshot_if_exists(&self.output_path) {
            Ok(Some(snapshot)) => {
                let load = self.session.resume_from(snapshot);
                tracing::info!(
                    "Resume: loaded {} existing records from {} (next id {})",
                    load.loaded,
                    self.output_path.display(),
                    load.next_id
                );
                if load.retained > 0 {
                    tracing::warn!(
                        "Resume: keeping {} unreadable or duplicate rows of {} as they are",
                        load.retained,
                        self.output_path.display()
                    );
                }
            }
            Ok(None) => {
                tracing::info!(
                    "Resume: {} does not exist yet, starting empty",
                    self.output_path.display()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Could not resume from {}: {}",
                    self.output_path.display(),
                    e
                );
            }
        }
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let base_url = Url::parse(&self.config.source.base_url).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!(
                "Invalid base-url '{}': {}",
                self.config.source.base_url, e
            ))
        })?;
        let body = self.fetcher.fetch(base_url.as_str()).await?;
        Ok(parse_category_index(&body, &base_url))
    }

    /// Crawls every category; returns true if the item limit stopped the run
    async fn crawl_categories(&mut self, categories: &[Category]) -> bool {
        let total = categories.len();

        for (index, category) in categories.iter().enumerate() {
            tracing::info!(
                "Category {}/{}: {} -> {}",
                index + 1,
                total,
                category.name,
                category.url
            );
            let category_start = Instant::now();
            let successes_before = self.session.successes();

            let outcome = match self.crawl_category(category).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        "Category {} failed and will be skipped: {}",
                        category.url,
                        e
                    );
                    self.session.record_failure();
                    sleep(self.config.crawler.category_cooldown()).await;
                    CategoryOutcome::Failed
                }
            };

            let summary = CategorySummary {
                name: category.name.clone(),
                added: self.session.successes() - successes_before,
                elapsed: category_start.elapsed(),
                outcome,
            };
            tracing::info!(
                "Category {}: +{} items in {:.2}s",
                summary.name,
                summary.added,
                summary.elapsed.as_secs_f64()
            );
            self.session.finish_category(summary);

            if outcome == CategoryOutcome::LimitReached {
                tracing::info!(
                    "Reached the limit of {} items, skipping {} remaining categories",
                    self.session.successes(),
                    total - index - 1
                );
                return true;
            }
        }

        false
    }

    /// Walks one category's listing pages, scraping every unseen product
    ///
    /// A listing fetch failure is returned; the caller treats it as a
    /// failure of this category only.
    async fn crawl_category(
        &mut self,
        category: &Category,
    ) -> std::result::Result<CategoryOutcome, FetchError> {
        let limit = self.config.crawler.limit;
        let mut visited_pages = HashSet::new();
        let mut next_page = Some(category.url.clone());

        while let Some(page_url) = next_page.take() {
            if !visited_pages.insert(page_url.clone()) {
                tracing::warn!("Pagination loops back to {}, stopping category", page_url);
                break;
            }

            tracing::info!("  Listing page {}", page_url);
            let body = self.fetcher.fetch(page_url.as_str()).await?;
            let listing = parse_listing(&body, &page_url);

            for product_url in &listing.product_urls {
                if self.session.is_seen(product_url.as_str()) {
                    continue;
                }

                self.process_product(product_url).await;

                if self.session.limit_reached(limit) {
                    return Ok(CategoryOutcome::LimitReached);
                }
            }

            next_page = listing.next_page_url;
        }

        Ok(CategoryOutcome::Completed)
    }

    /// Scrapes one product page and files the result
    ///
    /// Fetch and parse failures are counted and logged here and never
    /// returned. A failed checkpoint is logged and the crawl goes on.
    async fn process_product(&mut self, product_url: &Url) {
        match self.scrape_book(product_url).await {
            Ok(parsed) => {
                let record = self.session.record_success(parsed);
                tracing::debug!("Scraped #{} {}", record.id, record.title);

                let crawler = &self.config.crawler;
                if self.session.at_interval(crawler.progress_every) {
                    tracing::info!("    {} books collected...", self.session.successes());
                }
                if self.session.at_interval(crawler.checkpoint_every) {
                    self.checkpoint();
                }
            }
            Err(e) => {
                self.session.record_failure();
                tracing::warn!("Failed to scrape {}: {}", product_url, e);
            }
        }

        sleep(self.config.crawler.delay()).await;
    }

    async fn scrape_book(&self, product_url: &Url) -> Result<ParsedBook> {
        let body = self.fetcher.fetch(product_url.as_str()).await?;
        Ok(parse_detail(&body, product_url)?)
    }

    /// Rewrites the whole snapshot with everything collected so far
    ///
    /// A failed write leaves the previous snapshot in place; the records
    /// stay in memory for the next checkpoint or the final flush.
    fn checkpoint(&self) {
        match write_snapshot_retaining(
            &self.output_path,
            self.session.records(),
            self.session.retained_rows(),
        ) {
            Ok(()) => tracing::info!(
                "    Checkpoint: saved {} rows to {}",
                self.session.records().len(),
                self.output_path.display()
            ),
            Err(e) => tracing::warn!(
                "    Checkpoint of {} rows to {} failed, continuing: {}",
                self.session.records().len(),
                self.output_path.display(),
                e
            ),
        }
    }
}

/// Runs the main crawl operation
///
/// # Example
///
/// ```no_run
/// use shelf_crawler::config::Config;
/// use shelf_crawler::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = Config::default();
/// config.crawler.limit = Some(50);
/// let report = run_crawl(config).await?;
/// println!("{} books", report.total_records);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
