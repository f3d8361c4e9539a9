// HTTP transport for the search API.
// Owns the pooled client, classifies request failures, and retries
// transient statuses before anything reaches the fetch layer.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::TransportError;

use super::types::RateLimit;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Transport tuning knobs. Defaults match the public GitHub API; tests
/// point `base_url` at a local server and shrink the retry delays.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
    pub pool_max_idle: usize,
    pub max_retries: usize,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: GITHUB_API_BASE.to_string(),
            token: None,
            user_agent: "reposcout".to_string(),
            timeout: Duration::from_secs(10),
            pool_max_idle: 5,
            max_retries: 3,
            retry_min_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(8),
        }
    }
}

/// A response the transport obtained, whatever its status. Rate limit
/// headers are already parsed; non-2xx handling is the caller's call.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub rate_limit: RateLimit,
    pub body: String,
}

/// Pooled HTTP client for the search API. Requests that fail with a
/// retryable status (HTTP 429 or any 5xx) are retried with exponential
/// backoff; everything else surfaces as a classified error or response.
pub struct Transport {
    client: Client,
    base_url: String,
    backoff: ExponentialBuilder,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        if let Some(token) = &config.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| TransportError::Build("invalid token characters".to_string()))?,
            );
        }
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| TransportError::Build("invalid user agent".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(config.retry_min_delay)
            .with_max_delay(config.retry_max_delay)
            .with_max_times(config.max_retries)
            .with_jitter();

        Ok(Self {
            client,
            base_url: config.base_url,
            backoff,
        })
    }

    /// GET `path` with query parameters, retrying transient failures.
    /// Returns the response for any terminal status, including 4xx; the
    /// retry budget applies per call, not across calls.
    pub async fn send(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);

        (|| async { self.send_once(&url, params).await })
            .retry(self.backoff)
            .sleep(sleep)
            .when(TransportError::is_transient)
            .notify(|err: &TransportError, delay: Duration| {
                warn!("transient transport failure, retrying in {:?}: {}", delay, err);
            })
            .await
    }

    async fn send_once(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        let rate_limit = rate_limit_from_headers(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(TransportError::Protocol {
                status: Some(status.as_u16()),
                message: format!("retryable status {} from {}", status, url),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        Ok(RawResponse {
            status,
            rate_limit,
            body,
        })
    }
}

/// Parse rate limit headers, leaving zeroes for anything absent.
fn rate_limit_from_headers(headers: &HeaderMap) -> RateLimit {
    let field = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };

    RateLimit {
        limit: field("x-ratelimit-limit"),
        remaining: field("x-ratelimit-remaining"),
        reset: field("x-ratelimit-reset"),
    }
}
