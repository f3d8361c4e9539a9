//! # reposcout
//!
//! Incremental GitHub repository search with cached, rate-limit aware
//! paging.
//!
//! The pieces compose in one direction: a [`Transport`] owns the pooled
//! HTTP client and retries transient statuses, a [`Fetcher`] adds the
//! page cache, rate-limit waits, and an attempt budget on top of it,
//! and a [`SearchController`] drives one search session at a time,
//! feeding whatever [`SearchConsumer`] it was given. Results are
//! delivered in page order even though fetches run on background tasks;
//! starting a new search makes any in-flight page stale, and stale
//! pages are discarded when they land.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reposcout::consumer::{ConsoleConsumer, OutputMode};
//! use reposcout::{Fetcher, PageCache, SearchController, SearchSort, Transport, TransportConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), reposcout::SearchError> {
//! let transport = Arc::new(Transport::new(TransportConfig::default())?);
//! let cache = Arc::new(PageCache::default());
//! let fetcher = Arc::new(Fetcher::new(transport, cache));
//!
//! let consumer = ConsoleConsumer::new(OutputMode::Text);
//! let mut controller = SearchController::new(fetcher, consumer);
//!
//! controller.start_search("raft consensus", SearchSort::Stars, Some("Go"))?;
//! while controller.drain_next().await {
//!     if controller.is_exhausted() || !controller.load_more() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod args;
pub mod cache;
pub mod consumer;
pub mod controller;
pub mod error;
pub mod github;

pub use app::App;
pub use args::Args;
pub use cache::{CacheStats, PageCache};
pub use consumer::{ConsoleConsumer, OutputMode, SearchConsumer};
pub use controller::{Debouncer, SearchController};
pub use error::{FetchError, Result, SearchError, TransportError};
pub use github::{
    Fetcher, PageResult, RepositoryRecord, SearchKey, SearchSort, SearchTerms, Transport,
    TransportConfig,
};
