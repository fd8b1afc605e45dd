use serde::Deserialize;
use std::time::Duration;

/// Default catalog site crawled when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";

/// Main configuration structure for Shelf-Crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Politeness delay after every product fetch attempt (milliseconds)
    pub delay_ms: u64,

    /// Extra attempts made by the outer fetch loop
    pub retries: u32,

    /// Retries made by the connection layer; derived from `retries` when unset
    pub connection_retries: Option<u32>,

    /// Base of the connection layer's exponential backoff (milliseconds)
    pub connection_backoff_ms: u64,

    /// Step of the outer loop's linear backoff (milliseconds)
    pub retry_backoff_ms: u64,

    /// Per-request network timeout
    pub request_timeout_secs: u64,

    /// Stop after this many successfully parsed products
    pub limit: Option<u64>,

    /// Rewrite the snapshot after this many successes (0 disables)
    pub checkpoint_every: u64,

    /// Log a progress line after this many successes
    pub progress_every: u64,

    /// Pause after a whole category fails (milliseconds)
    pub category_cooldown_ms: u64,

    /// Continue from an existing snapshot instead of starting over
    pub resume: bool,

    /// Report every retry as a warning rather than at debug level
    pub verbose: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay_ms: 250,
            retries: 4,
            connection_retries: None,
            connection_backoff_ms: 800,
            retry_backoff_ms: 500,
            request_timeout_secs: 30,
            limit: None,
            checkpoint_every: 100,
            progress_every: 20,
            category_cooldown_ms: 5000,
            resume: false,
            verbose: false,
        }
    }
}

impl CrawlerConfig {
    /// Connection-level retry budget, `max(3, retries + 2)` unless set
    pub fn effective_connection_retries(&self) -> u32 {
        self.connection_retries
            .unwrap_or_else(|| self.retries.saturating_add(2).max(3))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn category_cooldown(&self) -> Duration {
        Duration::from_millis(self.category_cooldown_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfCrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/shelf-crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Upstream catalog site
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    /// Page carrying the category sidebar; category links resolve against it
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the CSV snapshot
    pub csv_path: String,

    /// Optional file receiving a copy of the log
    pub log_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "data/books.csv".to_string(),
            log_file: None,
        }
    }
}
