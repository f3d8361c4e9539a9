// Search controller module.
// Provides the pagination state machine and the input debouncer.

pub mod debounce;
pub mod pagination;

pub use debounce::{DEFAULT_QUIET_PERIOD, Debouncer};
pub use pagination::SearchController;
