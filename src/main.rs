//! Shelf-Crawler main entry point
//!
//! This is the command-line interface for the Shelf-Crawler catalog crawler.

use anyhow::{bail, Context};
use clap::Parser;
use shelf_crawler::catalog::Catalog;
use shelf_crawler::config::{load_config_with_hash, validate, Config};
use shelf_crawler::crawler::crawl;
use shelf_crawler::output::print_statistics;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Shelf-Crawler: a resumable book catalog crawler
///
/// Shelf-Crawler walks every category of a book catalog site, scrapes each
/// product page into one CSV row, and checkpoints as it goes so that an
/// interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "shelf-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A resumable book catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path of the CSV snapshot
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Seconds to wait after every product request
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Extra attempts per request after the connection retries give up
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Stop after this many new books
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Rewrite the snapshot after every N new books (0 disables)
    #[arg(long, value_name = "N")]
    checkpoint_every: Option<u64>,

    /// Continue from the existing snapshot
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start over, replacing the existing snapshot
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Catalog page carrying the category sidebar
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the existing snapshot and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) = resolve_config(&cli)?;

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, config.output.log_file.as_deref())?;

    if let (Some(path), Some(hash)) = (&cli.config, config_hash) {
        tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Loads the optional config file and layers the command-line flags on top
///
/// Returns the resolved configuration and the config file's hash, if any.
fn resolve_config(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(output) = &cli.output {
        config.output.csv_path = output.clone();
    }
    if let Some(delay) = cli.delay {
        if !delay.is_finite() || delay < 0.0 {
            bail!("--delay must be a non-negative number of seconds, got {}", delay);
        }
        config.crawler.delay_ms = (delay * 1000.0).round() as u64;
    }
    if let Some(retries) = cli.retries {
        config.crawler.retries = retries;
    }
    if cli.limit.is_some() {
        config.crawler.limit = cli.limit;
    }
    if let Some(every) = cli.checkpoint_every {
        config.crawler.checkpoint_every = every;
    }
    if cli.resume {
        config.crawler.resume = true;
    } else if cli.fresh {
        config.crawler.resume = false;
    }
    if let Some(log_file) = &cli.log_file {
        config.output.log_file = Some(log_file.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.source.base_url = base_url.clone();
    }
    if cli.verbose > 0 {
        config.crawler.verbose = true;
    }

    validate(&config).context("Invalid configuration")?;
    Ok((config, hash))
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr and, when `log_file` is set, to that file as well.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_crawler=info,warn"),
            1 => EnvFilter::new("shelf_crawler=debug,info"),
            2 => EnvFilter::new("shelf_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(open_log_file(Path::new(path))?))
                .with_ansi(false)
                .with_target(false),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Shelf-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Delay: {}ms", crawler.delay_ms);
    println!("  Retries: {}", crawler.retries);
    println!(
        "  Connection retries: {} (backoff {}ms)",
        crawler.effective_connection_retries(),
        crawler.connection_backoff_ms
    );
    println!("  Request timeout: {}s", crawler.request_timeout_secs);
    match crawler.limit {
        Some(limit) => println!("  Limit: {} books", limit),
        None => println!("  Limit: none"),
    }
    println!("  Checkpoint every: {} books", crawler.checkpoint_every);
    println!("  Category cooldown: {}ms", crawler.category_cooldown_ms);
    println!("  Resume: {}", crawler.resume);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);

    println!("\nOutput:");
    println!("  Snapshot: {}", config.output.csv_path);
    if let Some(log_file) = &config.output.log_file {
        println!("  Log file: {}", log_file);
    }

    println!("\n✓ Configuration is valid");
    if crawler.resume && Path::new(&config.output.csv_path).exists() {
        println!("✓ Would resume from {}", config.output.csv_path);
    } else {
        println!("✓ Would start a fresh crawl of {}", config.source.base_url);
    }
}

/// Handles the --stats mode: shows statistics for the snapshot
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Snapshot: {}\n", config.output.csv_path);

    let catalog = Catalog::load(Path::new(&config.output.csv_path))
        .with_context(|| format!("Failed to read {}", config.output.csv_path))?;

    print_statistics(&catalog);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    if config.crawler.resume {
        tracing::info!("Starting crawl (resuming from {})", config.output.csv_path);
    } else {
        tracing::info!("Starting fresh crawl (existing snapshot will be replaced)");
    }
    tracing::info!(
        "Source: {}, delay: {}ms, retries: {}, limit: {:?}",
        config.source.base_url,
        config.crawler.delay_ms,
        config.crawler.retries,
        config.crawler.limit
    );

    // Run the crawler
    match crawl(config).await {
        Ok(report) => {
            if !report.failed_categories.is_empty() {
                tracing::warn!(
                    "{} categories failed: {}",
                    report.failed_categories.len(),
                    report.failed_categories.join(", ")
                );
            }
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
