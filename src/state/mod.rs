//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunPhase`: the phase a crawl run is in (resume, index fetch, crawling, flush)
//! - `CrawlSession`: records, seen URLs, id counter and tallies owned by one run

mod run_phase;
mod session;

// Re-export main types
pub use run_phase::RunPhase;
pub use session::{CategoryOutcome, CategorySummary, CrawlSession, ResumeLoad};
