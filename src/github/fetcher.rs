// Page fetcher for repository search.
// Wraps the transport with a cache lookup, rate-limit waits, and a
// bounded attempt loop with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cache::PageCache;
use crate::error::{FetchError, TransportError};

use super::transport::{RawResponse, Transport};
use super::types::{PageResult, RawItem, RepositoryRecord, SearchKey, SearchResponse};

const SEARCH_PATH: &str = "/search/repositories";

/// Results requested per page. A shorter page marks the end of results.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Fetch tuning knobs. Tests shrink the backoff base so retry paths run
/// in milliseconds.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Attempts per page before giving up. Rate-limit waits do not
    /// count against this budget.
    pub attempts: u32,
    /// Base delay between failed attempts, doubled each time.
    pub backoff_base: Duration,
    /// Upper bound on a single rate-limit wait.
    pub rate_limit_cap: Duration,
    pub page_size: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: Duration::from_secs(1),
            rate_limit_cap: Duration::from_secs(60),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Fetches one search page at a time, consulting the shared cache
/// before touching the network.
pub struct Fetcher {
    transport: Arc<Transport>,
    cache: Arc<PageCache>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(transport: Arc<Transport>, cache: Arc<PageCache>) -> Self {
        Self::with_config(transport, cache, FetchConfig::default())
    }

    pub fn with_config(transport: Arc<Transport>, cache: Arc<PageCache>, config: FetchConfig) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }

    /// Fetch one page of results for `key`, from cache when possible.
    ///
    /// Rate-limited responses wait out the reset (bounded by the
    /// configured cap) and retry without consuming an attempt. Anything
    /// else that fails burns an attempt; once the budget is spent the
    /// last failure is returned as `FetchError::Exhausted`.
    pub async fn fetch(&self, key: &SearchKey) -> Result<PageResult, FetchError> {
        if let Some(page) = self.cache.get(key) {
            debug!("cache hit for '{}' page {}", key.query, key.page);
            return Ok(page);
        }

        let params = self.query_params(key);
        let mut attempt: u32 = 1;

        loop {
            let failure = match self.transport.send(SEARCH_PATH, &params).await {
                Ok(response) => {
                    if let Some(wait) = rate_limit_wait(&response, self.config.rate_limit_cap) {
                        warn!(
                            "rate limited on page {}; waiting {}s before retrying",
                            key.page,
                            wait.as_secs()
                        );
                        if !wait.is_zero() {
                            sleep(wait).await;
                        }
                        continue;
                    }

                    if response.status == StatusCode::UNPROCESSABLE_ENTITY {
                        debug!("page {} is past the search window; ending results", key.page);
                        return Ok(PageResult::end_of_results());
                    }

                    if response.status.is_success() {
                        let page = self.parse_page(&response.body);
                        debug!(
                            "page {} fetched: {} records of {} total",
                            key.page,
                            page.records.len(),
                            page.total_count
                        );
                        self.cache.put(key.clone(), page.clone());
                        return Ok(page);
                    }

                    TransportError::Protocol {
                        status: Some(response.status.as_u16()),
                        message: format!("unexpected status {}", response.status),
                    }
                }
                Err(err) => err,
            };

            warn!("attempt {} for page {} failed: {}", attempt, key.page, failure);
            if attempt >= self.config.attempts {
                return Err(FetchError::Exhausted {
                    attempts: self.config.attempts,
                    source: failure,
                });
            }

            let delay = self.config.backoff_base * 2u32.pow(attempt);
            debug!("backing off {:?} before attempt {}", delay, attempt + 1);
            sleep(delay).await;
            attempt += 1;
        }
    }

    fn query_params(&self, key: &SearchKey) -> Vec<(&'static str, String)> {
        let mut query = key.query.clone();
        if let Some(language) = &key.language {
            query.push_str(&format!(" language:{}", language));
        }

        vec![
            ("q", query),
            ("sort", key.sort.query_value().to_string()),
            ("order", "desc".to_string()),
            ("page", key.page.to_string()),
            ("per_page", self.config.page_size.to_string()),
        ]
    }

    /// Map a response body onto a page, absorbing malformed input. A
    /// body without an item list reads as an empty final page.
    fn parse_page(&self, body: &str) -> PageResult {
        let response: SearchResponse = serde_json::from_str(body).unwrap_or_default();

        let Some(items) = response.items else {
            warn!("response body carried no items; treating as empty page");
            return PageResult {
                records: Vec::new(),
                total_count: response.total_count,
                is_last_page: true,
            };
        };

        let records: Vec<RepositoryRecord> = items
            .into_iter()
            .map(|item| {
                RepositoryRecord::from_raw(serde_json::from_value::<RawItem>(item).unwrap_or_default())
            })
            .collect();

        let is_last_page = (records.len() as u32) < self.config.page_size;
        PageResult {
            records,
            total_count: response.total_count,
            is_last_page,
        }
    }
}

/// Wait needed before retrying a rate-limited response, if it is one.
/// A reset already in the past yields a zero wait; the retry itself
/// still skips the attempt budget.
fn rate_limit_wait(response: &RawResponse, cap: Duration) -> Option<Duration> {
    if response.status != StatusCode::FORBIDDEN {
        return None;
    }
    let limits = &response.rate_limit;
    if limits.remaining > 0 || limits.reset == 0 {
        return None;
    }

    let now = Utc::now().timestamp();
    let wait = (limits.reset as i64 - now).max(0) as u64;
    Some(Duration::from_secs(wait).min(cap))
}
