// src/portal/client.rs
use crate::portal::models::{PortalConfig, PORTAL_USER_AGENT};
use crate::utils::error::PortalError;
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::{Duration, Instant};

/// Why the previous attempt failed; drives the next delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    EmptyBody,
    RateLimited,
    Failed,
}

/// Doubles the delay after an ordinary failure (capped at `max`), triples it
/// after a 429 (capped at `2 * max`).
pub fn next_delay(current: Duration, reason: RetryReason, max: Duration) -> Duration {
    match reason {
        RetryReason::RateLimited => (current * 3).min(max * 2),
        RetryReason::EmptyBody | RetryReason::Failed => (current * 2).min(max),
    }
}

/// Uniform random wait in `[0, max)`. Zero when `max` is zero.
pub fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

/// HTTP access to the portal's internal search and detail endpoints.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        if reqwest::Url::parse(&config.base_url).is_err() {
            return Err(PortalError::InvalidUrl(config.base_url));
        }
        let http = reqwest::Client::builder()
            .user_agent(PORTAL_USER_AGENT)
            .default_headers(browser_headers())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Posts the public search form for one contract number and returns the results page.
    pub async fn search(&self, contract_number: &str) -> Result<String, PortalError> {
        tracing::info!("Fetching search page html for search \"{}\"", contract_number);
        let url = self.config.search_url();
        self.fetch_with_retry(contract_number, || {
            self.http
                .post(&url)
                .query(&self.config.search_query())
                .header(header::REFERER, self.config.search_referer())
                .header(header::ORIGIN, self.config.origin())
                .form(&self.config.search_form(contract_number))
        })
        .await
    }

    /// Fetches the detail page addressed by an internal contract id.
    pub async fn detail(&self, contract_number: &str, cid: &str) -> Result<String, PortalError> {
        tracing::info!("Fetching final page html for \"{}\" (CID {})", contract_number, cid);
        let url = self.config.detail_url(cid);
        self.fetch_with_retry(contract_number, || self.http.get(&url)).await
    }

    async fn fetch_with_retry<F>(&self, target: &str, build: F) -> Result<String, PortalError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let attempts = self.config.max_retries.max(1);
        let mut delay = self.config.base_delay;

        for attempt in 1..=attempts {
            tokio::time::sleep(delay + jitter(self.config.max_jitter)).await;
            let started = Instant::now();

            let reason = match send(build()).await {
                Ok(body) if !body.trim().is_empty() => {
                    tracing::info!(
                        "Page for '{}' fetched successfully - Length: {}, Time taken: {:.4} seconds",
                        target,
                        body.len(),
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(body);
                }
                Ok(_) => RetryReason::EmptyBody,
                Err(PortalError::RateLimited) => RetryReason::RateLimited,
                Err(e) => {
                    tracing::error!("Request for '{}' failed: {}", target, e);
                    RetryReason::Failed
                }
            };

            delay = next_delay(delay, reason, self.config.max_delay);
            if attempt < attempts {
                tracing::warn!(
                    "Fetch attempt {} for '{}' failed ({:?}), retrying in {:.2}s",
                    attempt,
                    target,
                    reason,
                    delay.as_secs_f64()
                );
            }
        }

        tracing::error!("All {} fetch attempts failed for '{}'", attempts, target);
        Err(PortalError::RetriesExhausted {
            target: target.to_string(),
            attempts,
        })
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<String, PortalError> {
    let response = request.send().await?; // Propagates reqwest::Error as PortalError::Network

    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited (429) by {}", url);
            return Err(PortalError::RateLimited);
        }
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        return Err(PortalError::Http(status));
    }

    let body = response.text().await?;
    tracing::debug!("Downloaded {} bytes", body.len());
    Ok(body)
}
