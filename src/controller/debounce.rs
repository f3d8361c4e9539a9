// Debouncer for bursty triggers.
// Each trigger cancels the previous pending action; only the last one
// in a burst fires, after a quiet period.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Quiet period used when none is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Collapses rapid trigger bursts into a single delayed action.
///
/// Must be used from within a tokio runtime; the pending action runs on
/// a spawned task after the quiet period elapses without a newer
/// trigger.
pub struct Debouncer {
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    /// Schedule `action` to run after the quiet period, replacing any
    /// action still pending from an earlier trigger.
    pub fn trigger<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            sleep(quiet_period).await;
            action();
        }));
    }

    /// Drop the pending action, if any, without running it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
