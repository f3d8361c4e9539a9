// Bounded in-memory cache of mapped result pages.
// Exact-key lookups only; inserting past capacity evicts the
// least-recently-used page.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;

use crate::github::{PageResult, SearchKey};

/// Default number of pages kept in memory.
pub const DEFAULT_CAPACITY: usize = 100;

/// Hit/miss counters plus the current cache size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

/// LRU cache of result pages, shared between fetches via `Arc`.
pub struct PageCache {
    entries: Mutex<LruCache<SearchKey, PageResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageCache {
    /// Create a cache bounded to `capacity` pages (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a page, marking it most recently used on a hit.
    pub fn get(&self, key: &SearchKey) -> Option<PageResult> {
        let mut entries = self.entries.lock().expect("page cache mutex poisoned");
        match entries.get(key) {
            Some(page) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(page.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a page, evicting the least-recently-used entry if full.
    pub fn put(&self, key: SearchKey, page: PageResult) {
        self.entries
            .lock()
            .expect("page cache mutex poisoned")
            .put(key, page);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("page cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
