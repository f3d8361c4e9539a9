// Error types for reposcout.
// Separates transport failures (classified per request) from fetch
// exhaustion and local search validation.

use thiserror::Error;

/// Failure of a single HTTP exchange, classified so callers can decide
/// what is worth retrying.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection refused: {url}")]
    ConnectionRefused { url: String },

    #[error("protocol error: {message}")]
    Protocol { status: Option<u16>, message: String },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl TransportError {
    /// Classify a reqwest failure for the request that produced it.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            TransportError::ConnectionRefused {
                url: url.to_string(),
            }
        } else {
            TransportError::Protocol {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }

    /// True for failures that tend to clear on their own: HTTP 429 and
    /// any 5xx. Everything else is handed to the caller unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Protocol {
                status: Some(code),
                ..
            } if *code == 429 || *code >= 500
        )
    }
}

/// A page fetch that gave up after exhausting its attempt budget.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("search request failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

/// Top-level errors surfaced by the search controller and the CLI.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search query must not be empty")]
    EmptyQuery,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, SearchError>;
