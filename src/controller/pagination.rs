// Incremental search session state machine.
// One in-flight page fetch at a time; completions carry a generation
// tag so a superseded search can never corrupt the one that replaced
// it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::consumer::SearchConsumer;
use crate::error::{FetchError, SearchError};
use crate::github::{Fetcher, PageResult, SearchKey, SearchSort, SearchTerms};

use super::debounce::Debouncer;

enum ControllerEvent {
    Completed {
        generation: u64,
        page: u32,
        outcome: Result<PageResult, FetchError>,
    },
    Start { epoch: u64, terms: SearchTerms },
}

/// Per-session bookkeeping. Replaced wholesale when a new search
/// starts; the generation identifies which session a completion
/// belongs to.
struct ControllerState {
    terms: SearchTerms,
    page: u32,
    loading: bool,
    exhausted: bool,
    total_fetched: usize,
    generation: u64,
}

impl ControllerState {
    fn new(terms: SearchTerms, generation: u64) -> Self {
        Self {
            terms,
            page: 1,
            loading: false,
            exhausted: false,
            total_fetched: 0,
            generation,
        }
    }

    fn key(&self) -> SearchKey {
        self.terms.key(self.page)
    }

    fn apply_page(&mut self, result: &PageResult) {
        self.loading = false;
        self.total_fetched += result.records.len();
        self.exhausted = result.is_last_page;
        if !result.is_last_page {
            self.page += 1;
        }
    }

    fn apply_failure(&mut self) {
        self.loading = false;
    }
}

/// Drives a paginated search session and feeds its consumer.
///
/// Fetches run on spawned tasks; their completions queue on a channel
/// owned here and only mutate state when the owner drains them, so the
/// consumer always observes batches in page order. Stale completions
/// from an earlier search are dropped on arrival.
pub struct SearchController<C> {
    fetcher: Arc<Fetcher>,
    consumer: C,
    state: Option<ControllerState>,
    generation: u64,
    // Stamped into debounced start requests; a direct start advances it
    // so requests armed before the direct one are dropped on drain.
    debounce_epoch: u64,
    last_error: Option<FetchError>,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: UnboundedReceiver<ControllerEvent>,
    debouncer: Debouncer,
}

impl<C: SearchConsumer> SearchController<C> {
    pub fn new(fetcher: Arc<Fetcher>, consumer: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            consumer,
            state: None,
            generation: 0,
            debounce_epoch: 0,
            last_error: None,
            events_tx,
            events_rx,
            debouncer: Debouncer::default(),
        }
    }

    /// Replace the debounce quiet period (default 300ms).
    pub fn with_debounce(mut self, quiet_period: Duration) -> Self {
        self.debouncer = Debouncer::new(quiet_period);
        self
    }

    /// Begin a fresh session and dispatch its first page. Any fetch
    /// still in flight for the previous session becomes stale, and any
    /// debounced start armed earlier is withdrawn: it must not fire
    /// over top of this newer, explicit one.
    pub fn start_search(
        &mut self,
        query: &str,
        sort: SearchSort,
        language: Option<&str>,
    ) -> Result<(), SearchError> {
        // Withdraw debounced input from before this call, whether its
        // quiet period is still running or its start is already queued.
        self.debouncer.cancel();
        self.debounce_epoch += 1;
        self.begin(SearchTerms::new(query, sort, language))
    }

    /// Like [`start_search`](Self::start_search), but waits out a quiet
    /// period first so keystroke bursts collapse into one search. The
    /// search starts when the owner next drains events; a direct start
    /// issued in the meantime withdraws it.
    pub fn debounced_start_search(&mut self, query: &str, sort: SearchSort, language: Option<&str>) {
        let terms = SearchTerms::new(query, sort, language);
        let epoch = self.debounce_epoch;
        let events = self.events_tx.clone();
        self.debouncer.trigger(move || {
            let _ = events.send(ControllerEvent::Start { epoch, terms });
        });
    }

    fn begin(&mut self, terms: SearchTerms) -> Result<(), SearchError> {
        if terms.query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        self.generation += 1;
        info!(
            "starting search '{}' (sort: {}, language: {:?})",
            terms.query, terms.sort, terms.language
        );
        self.last_error = None;
        self.state = Some(ControllerState::new(terms, self.generation));
        self.load_more();
        Ok(())
    }

    /// Dispatch a fetch for the current page, typically as the rendered
    /// list nears its end. Returns false without dispatching when no
    /// session exists, a fetch is already in flight, or the session is
    /// exhausted.
    pub fn load_more(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.loading || state.exhausted {
            return false;
        }

        state.loading = true;
        let key = state.key();
        let generation = state.generation;
        let page = state.page;

        self.consumer.on_loading_start();

        let fetcher = Arc::clone(&self.fetcher);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&key).await;
            let _ = events.send(ControllerEvent::Completed {
                generation,
                page,
                outcome,
            });
        });
        true
    }

    /// Apply every event already queued, without waiting. Returns how
    /// many were applied.
    pub fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next event and apply it. Returns false only if the
    /// event channel closed.
    pub async fn drain_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Start { epoch, terms } => {
                if epoch != self.debounce_epoch {
                    debug!(
                        "discarding debounced start '{}' withdrawn by a direct search",
                        terms.query
                    );
                    return;
                }
                if let Err(err) = self.begin(terms) {
                    self.consumer.on_error(&err.to_string());
                }
            }
            ControllerEvent::Completed {
                generation,
                page,
                outcome,
            } => self.apply_completion(generation, page, outcome),
        }
    }

    fn apply_completion(
        &mut self,
        generation: u64,
        page: u32,
        outcome: Result<PageResult, FetchError>,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.generation != generation {
            debug!("discarding stale page {} from a superseded search", page);
            return;
        }

        match outcome {
            Ok(result) => {
                debug!("applying page {}: {} records", page, result.records.len());
                self.consumer.on_batch(&result.records);
                state.apply_page(&result);
                if state.exhausted {
                    self.consumer.on_exhausted();
                }
            }
            Err(err) => {
                warn!("page {} failed: {}", page, err);
                state.apply_failure();
                let message = err.to_string();
                self.last_error = Some(err);
                self.consumer.on_error(&message);
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.loading)
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.exhausted)
    }

    /// Next page to request, once a session exists.
    pub fn current_page(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.page)
    }

    /// Records delivered to the consumer over the current session.
    pub fn total_fetched(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.total_fetched)
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    /// The failure that ended the most recent fetch, if any. Cleared
    /// when a new search starts.
    pub fn take_last_error(&mut self) -> Option<FetchError> {
        self.last_error.take()
    }
}
