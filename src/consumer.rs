// Consumer contract between the search controller and presentation.
// The controller delivers batches and session notices in order, on the
// task that drains its events.

use tracing::debug;

use crate::github::RepositoryRecord;

/// Receives search progress from the controller.
///
/// Calls arrive on the controller's draining task, in order: a loading
/// notice when a fetch is dispatched, then exactly one batch, error, or
/// exhaustion notice for the page it resolves to. Batches append; a new
/// search implicitly resets whatever the consumer has accumulated.
pub trait SearchConsumer {
    /// A page fetch was dispatched.
    fn on_loading_start(&mut self);

    /// A page arrived. Records are already mapped and ordered.
    fn on_batch(&mut self, records: &[RepositoryRecord]);

    /// The session ran out of results; no further batches will arrive
    /// until a new search starts.
    fn on_exhausted(&mut self);

    /// A page fetch failed after exhausting its retries. The session
    /// stays where it was and may be resumed with another load.
    fn on_error(&mut self, message: &str);
}

/// Output style for the command-line consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable listing.
    Text,
    /// One JSON object per record, suitable for piping.
    Json,
}

/// Writes batches to stdout as they arrive.
pub struct ConsoleConsumer {
    mode: OutputMode,
    errored: bool,
    batches: usize,
    records_seen: usize,
}

impl ConsoleConsumer {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            errored: false,
            batches: 0,
            records_seen: 0,
        }
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    fn print_text(record: &RepositoryRecord) {
        let language = record.language.as_deref().unwrap_or("-");
        let created = record
            .created_at
            .map(|at| at.format(" | created %Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{} by {}  [{} | {} stars | {} watchers{}]",
            record.name, record.owner_login, language, record.star_count, record.watcher_count, created
        );
        println!("    {}", record.description);
        println!("    {}", record.html_url);
    }
}

impl SearchConsumer for ConsoleConsumer {
    fn on_loading_start(&mut self) {
        debug!("fetching next page");
    }

    fn on_batch(&mut self, records: &[RepositoryRecord]) {
        self.batches += 1;
        self.records_seen += records.len();

        for record in records {
            match self.mode {
                OutputMode::Text => Self::print_text(record),
                OutputMode::Json => {
                    if let Ok(line) = serde_json::to_string(record) {
                        println!("{}", line);
                    }
                }
            }
        }
    }

    fn on_exhausted(&mut self) {
        if self.mode == OutputMode::Text {
            println!("(no further results)");
        }
    }

    fn on_error(&mut self, message: &str) {
        self.errored = true;
        eprintln!("search failed: {}", message);
    }
}
