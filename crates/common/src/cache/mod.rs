//! In-process query result cache
//!
//! Provides:
//! - Bounded LRU storage keyed by normalized query
//! - Time-to-live expiry (expired entries are misses)
//! - Generation tagging so results computed against an older index are never served
//! - Full flush on index mutation

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::CacheConfig;
use crate::metrics;

struct Entry<V> {
    value: V,
    generation: u64,
    inserted_at: Instant,
}

/// Thread-safe LRU cache with TTL and index-generation tagging
pub struct QueryCache<V> {
    /// `None` when caching is disabled (capacity 0)
    entries: Option<Mutex<LruCache<String, Entry<V>>>>,
    ttl: Duration,
    name: &'static str,
}

impl<V: Clone> QueryCache<V> {
    /// Create a cache from configuration
    pub fn new(config: &CacheConfig, name: &'static str) -> Self {
        Self::with_ttl(config.capacity, config.ttl(), name)
    }

    /// Create a cache with explicit bounds
    pub fn with_ttl(capacity: usize, ttl: Duration, name: &'static str) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
            name,
        }
    }

    /// Look up `key`, treating expired or other-generation entries as misses
    pub fn get(&self, key: &str, generation: u64) -> Option<V> {
        let entries = self.entries.as_ref()?;
        let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());

        let lookup = entries.get(key).map(|entry| {
            (entry.generation == generation && entry.inserted_at.elapsed() < self.ttl)
                .then(|| entry.value.clone())
        });
        let hit = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        metrics::record_cache(hit.is_some(), self.name);
        if hit.is_some() {
            debug!(cache = self.name, key, "Cache hit");
        } else {
            debug!(cache = self.name, key, "Cache miss");
        }
        hit
    }

    /// Store `value` computed against index `generation`.
    ///
    /// An insert tagged with a generation older than an existing entry's is dropped.
    pub fn insert(&self, key: impl Into<String>, generation: u64, value: V) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let key = key.into();
        let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = entries.peek(&key) {
            if existing.generation > generation {
                return;
            }
        }

        debug!(cache = self.name, key = %key, generation, "Cache set");
        entries.put(
            key,
            Entry {
                value,
                generation,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
            let flushed = entries.len();
            entries.clear();
            debug!(cache = self.name, flushed, "Cache flushed");
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map(|e| e.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
