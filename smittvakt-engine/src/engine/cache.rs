//! Clean-file cache.
//!
//! Units that scanned Clean are remembered by content digest so repeat
//! scans skip the matcher. Keys include the matcher epoch and the scan
//! option bits: a recompile or a different option set must never reuse a
//! stale verdict. Infected and errored units are never cached.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

const DEFAULT_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    digest: [u8; 32],
    epoch: u64,
    options: u32,
}

impl CacheKey {
    pub fn new(data: &[u8], epoch: u64, options: u32) -> Self {
        Self {
            digest: *blake3::hash(data).as_bytes(),
            epoch,
            options,
        }
    }
}

#[derive(Debug)]
pub(crate) struct CleanCache {
    entries: Mutex<LruCache<CacheKey, ()>>,
}

impl CleanCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().get(key).is_some()
    }

    pub fn insert(&self, key: CacheKey) {
        self.entries.lock().put(key, ());
    }
}
