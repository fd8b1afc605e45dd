//! Configuration module for Shelf-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; command-line flags are layered on top
//! by the binary.
//!
//! # Example
//!
//! ```no_run
//! use shelf_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Checkpoint every {} records", config.crawler.checkpoint_every);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig, DEFAULT_BASE_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
