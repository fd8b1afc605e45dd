//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a proper user agent string
//! - A connection-level retry policy with exponential backoff
//! - An outer retry loop with linear backoff on top of it
//! - Error classification
//!
//! # Retry Logic
//!
//! | Condition | Connection layer | Outer loop |
//! |-----------|------------------|------------|
//! | Connect / read / timeout error | Retry, exponential backoff | Retry, linear backoff |
//! | HTTP 429, 500, 502, 503, 504 | Retry, exponential backoff | Retry, linear backoff |
//! | Any other non-2xx status | Fail immediately | Retry, linear backoff |
//! | Client construction error | Fail immediately | Fail immediately |

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry budget and backoff base for the connection layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-indexed): `backoff * 2^(retry - 1)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request network timeout
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches documents with two layers of retries
///
/// [`Fetcher::fetch`] is what the coordinator calls. It runs
/// [`Fetcher::fetch_with_policy`] up to `retries + 1` times, sleeping
/// `retry_backoff * attempt` in between.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    retries: u32,
    retry_backoff: Duration,
    verbose: bool,
}

impl Fetcher {
    pub fn new(
        client: Client,
        policy: RetryPolicy,
        retries: u32,
        retry_backoff: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            client,
            policy,
            retries,
            retry_backoff,
            verbose,
        }
    }

    /// Builds a fetcher and its client from the crawler settings
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, FetchError> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(crawler.request_timeout_secs),
        )
        .map_err(FetchError::Client)?;

        let policy = RetryPolicy {
            max_retries: crawler.effective_connection_retries(),
            backoff: Duration::from_millis(crawler.connection_backoff_ms),
        };

        Ok(Self::new(
            client,
            policy,
            crawler.retries,
            Duration::from_millis(crawler.retry_backoff_ms),
            crawler.verbose,
        ))
    }

    /// Fetches a document body, retrying any failure
    ///
    /// Returns the last error once `retries + 1` rounds of the connection
    /// policy have all failed.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_with_policy(url).await {
                Ok(body) => return Ok(body),
                Err(e) if matches!(e, FetchError::Client(_)) => return Err(e),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    self.report_retry(attempt, self.retries, url, &e);
                    sleep(self.retry_backoff.saturating_mul(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetches a document body under the connection-level [`RetryPolicy`]
    ///
    /// Only transient failures are retried; see [`FetchError::is_transient`].
    pub async fn fetch_with_policy(&self, url: &str) -> Result<String, FetchError> {
        let mut retry = 0;
        loop {
            match self.send_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && retry < self.policy.max_retries => {
                    retry += 1;
                    let delay = self.policy.delay_for_retry(retry);
                    debug!(
                        "Connection retry {}/{} for {} in {:?}: {}",
                        retry, self.policy.max_retries, url, delay, e
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a single GET and reads the body
    async fn send_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    fn report_retry(&self, attempt: u32, of: u32, url: &str, error: &FetchError) {
        if self.verbose {
            warn!("GET failed ({}/{}) {}: {}. Retrying...", attempt, of, url, error);
        } else {
            debug!("GET failed ({}/{}) {}: {}. Retrying...", attempt, of, url, error);
        }
    }
}
