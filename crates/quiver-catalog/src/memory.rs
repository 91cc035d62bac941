use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use resource_types::Resource;
use serde::Serialize;

/// The in-process tier: a bounded LRU of loaded resources keyed by
/// `"kind/id"`, with approximate byte accounting so a catalog of unusually
/// large descriptors cannot grow the cache without bound.
#[derive(Debug)]
pub(crate) struct MemoryCache {
    entries: LruCache<String, CachedResource>,
    bytes: u64,
    soft_max_bytes: u64,
    hits: u64,
    misses: u64,
}

#[derive(Debug)]
struct CachedResource {
    resource: Arc<Resource>,
    cost: u64,
}

impl MemoryCache {
    pub(crate) fn new(max_entries: NonZeroUsize, soft_max_bytes: u64) -> Self {
        Self {
            entries: LruCache::new(max_entries),
            bytes: 0,
            soft_max_bytes,
            hits: 0,
            misses: 0,
        }
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Arc<Resource>> {
        match self.entries.get(key) {
            Some(cached) => {
                self.hits += 1;
                Some(Arc::clone(&cached.resource))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert `resource` with an approximate `cost` in bytes (we use the size
    /// of the source document). Evicts least-recently-used entries while the
    /// soft byte budget is exceeded.
    pub(crate) fn insert(&mut self, key: String, resource: Arc<Resource>, cost: u64) {
        if let Some(evicted) = self.entries.push(key, CachedResource { resource, cost }) {
            self.bytes = self.bytes.saturating_sub(evicted.1.cost);
        }
        self.bytes += cost;
        while self.bytes > self.soft_max_bytes && self.entries.len() > 1 {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.bytes = self.bytes.saturating_sub(evicted.cost),
                None => break,
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// A point-in-time snapshot of the in-process cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub hits: u64,
    pub misses: u64,
}
