//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the HTTP client with a proper user agent string
//! - GET requests to fetch page content
//! - Error classification (timeout / transport / HTTP status)
//! - An optional retry wrapper around the single-attempt fetch

use crate::config::{RetryConfig, UserAgentConfig};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Page-level fetch failures; any of these aborts the current run
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

impl FetchError {
    /// True for failures worth retrying: timeouts, transport faults, and
    /// server-side (5xx) statuses. Client errors (4xx) fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
        }
    }
}

/// Builds the HTTP client used for the whole run
///
/// The total request timeout is the bounded wait the fetch contract
/// promises; exceeding it surfaces as [`FetchError::Timeout`].
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let ua = format!("{}/{}", user_agent.name, user_agent.version);

    reqwest::Client::builder()
        .user_agent(ua)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one page body with a single attempt
///
/// # Errors
///
/// * [`FetchError::Timeout`] - the bounded wait elapsed
/// * [`FetchError::HttpStatus`] - the response carried a non-success status
/// * [`FetchError::Transport`] - DNS failure, connection reset, and the like
pub async fn fetch_page(client: &reqwest::Client, url: &Url) -> Result<String, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| classify_error(url, e))
}

fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: e,
        }
    }
}

/// Retry policy wrapping the fetch contract
///
/// Retry is a strategy around `fetch_page`, not part of the coordinator:
/// with `max_attempts = 1` this degrades to the plain single-attempt fetch.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Fetches a page, retrying transient failures per the given policy
///
/// Non-transient failures (4xx statuses) propagate immediately; the last
/// error is returned verbatim once attempts are exhausted.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &Url,
    policy: RetryPolicy,
) -> Result<String, FetchError> {
    let mut attempt = 1;
    loop {
        match fetch_page(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    "Fetch attempt {}/{} for {} failed ({}), retrying",
                    attempt,
                    policy.max_attempts,
                    url,
                    e
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
