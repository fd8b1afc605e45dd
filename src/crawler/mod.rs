//! Crawler module for fetching and scraping the catalog site
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with two layers of retries
//! - HTML parsing of detail, listing and index pages
//! - Overall crawl coordination, checkpointing and resume

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, Fetcher, RetryPolicy};
pub use parser::{
    parse_category_index, parse_detail, parse_listing, Category, ListingPage, ParsedBook,
    UNKNOWN_CATEGORY,
};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client
/// 2. Reload the existing snapshot if resuming
/// 3. Fetch the category index
/// 4. Scrape every category, checkpointing as it goes
/// 5. Write the final snapshot
pub async fn crawl(config: Config) -> Result<CrawlReport> {
    run_crawl(config).await
}
