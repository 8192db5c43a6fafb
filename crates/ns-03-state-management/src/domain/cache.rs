//! # Shared Read Cache
//!
//! Path-keyed LRU of `Arc<Value>` snapshots for hot readers (the renderer
//! polling `game.player` every frame). A hit costs a refcount bump instead of
//! a deep copy.
//!
//! Any write or history movement clears the whole cache; a path entry can be
//! stale through an ancestor or descendant write, so per-key eviction is not
//! enough.

use lru::LruCache;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

pub struct ReadCache {
    entries: LruCache<String, Arc<Value>>,
    hits: u64,
    misses: u64,
    invalidations: u64,
}

impl ReadCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            hits: 0,
            misses: 0,
            invalidations: 0,
        }
    }

    pub fn get(&mut self, path: &str) -> Option<Arc<Value>> {
        match self.entries.get(path) {
            Some(value) => {
                self.hits += 1;
                Some(Arc::clone(value))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, path: &str, value: Arc<Value>) {
        self.entries.put(path.to_string(), value);
    }

    /// Drop every entry.
    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
        }
        self.invalidations += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.entries.cap().get(),
            hits: self.hits,
            misses: self.misses,
            invalidations: self.invalidations,
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.invalidations = 0;
    }
}
