// GitHub search API module.
// Provides the transport, the page fetcher, and the search data model.

pub mod fetcher;
pub mod transport;
pub mod types;

pub use fetcher::{DEFAULT_PAGE_SIZE, FetchConfig, Fetcher};
pub use transport::{RawResponse, Transport, TransportConfig};
pub use types::*;
