// CLI session driver.
// Wires transport, cache, and fetcher into a controller, then walks
// pages until exhaustion, a failure, or the page cap.

use std::sync::Arc;

use tracing::info;

use crate::args::Args;
use crate::cache::PageCache;
use crate::consumer::{ConsoleConsumer, OutputMode};
use crate::controller::SearchController;
use crate::error::Result;
use crate::github::{Fetcher, SearchSort, Transport, TransportConfig};

/// One command-line search session.
pub struct App {
    controller: SearchController<ConsoleConsumer>,
    query: String,
    sort: SearchSort,
    language: Option<String>,
    page_cap: Option<u32>,
}

impl App {
    pub fn new(args: &Args) -> Result<Self> {
        let transport = Transport::new(TransportConfig {
            token: args.token.clone(),
            ..TransportConfig::default()
        })?;
        let cache = Arc::new(PageCache::default());
        let fetcher = Arc::new(Fetcher::new(Arc::new(transport), cache));

        let mode = if args.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let controller = SearchController::new(fetcher, ConsoleConsumer::new(mode));

        Ok(Self {
            controller,
            query: args.query.clone(),
            sort: args.sort,
            language: args.language.clone(),
            page_cap: args.pages,
        })
    }

    /// Run the session to completion. A fetch that fails after all its
    /// retries has already been reported by the consumer; it surfaces
    /// here as the session error.
    pub async fn run(mut self) -> Result<()> {
        self.controller
            .start_search(&self.query, self.sort, self.language.as_deref())?;

        let mut pages_walked: u32 = 0;
        loop {
            // A fetch is in flight at this point, so an event is coming.
            if !self.controller.drain_next().await {
                break;
            }
            if let Some(err) = self.controller.take_last_error() {
                return Err(err.into());
            }
            pages_walked += 1;

            if self.controller.is_exhausted() {
                info!(
                    "search exhausted after {} pages ({} records)",
                    pages_walked,
                    self.controller.total_fetched()
                );
                break;
            }
            if let Some(cap) = self.page_cap {
                if pages_walked >= cap {
                    info!(
                        "stopping at the page cap ({} pages, {} records)",
                        pages_walked,
                        self.controller.total_fetched()
                    );
                    break;
                }
            }
            if !self.controller.load_more() {
                break;
            }
        }

        Ok(())
    }
}
