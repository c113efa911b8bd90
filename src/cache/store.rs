//! Result memoization keyed by source and query.
//!
//! Repeating a query within the TTL window serves the previous response
//! without touching the network. Entries are evicted lazily: an expired
//! entry is dropped the next time it is read, or when the whole cache is
//! cleared. The cache is process-wide; callers needing finer-grained
//! clearing use distinct source identifiers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::SearchOption;

/// Cache key: one source identifier plus the raw query it answered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub query: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedEntry {
    options: Vec<SearchOption>,
    cached_at: DateTime<Utc>,
}

impl CachedEntry {
    fn new(options: Vec<SearchOption>) -> Self {
        Self {
            options,
            cached_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.cached_at;
        // Future timestamps (clock skew) count as fresh.
        age.num_milliseconds() >= 0 && age.num_milliseconds() as u128 >= ttl.as_millis()
    }
}

/// Process-wide lookup memoization, shared by every field handle.
///
/// Constructed once and shared by reference; keeping it injectable rather
/// than hidden in a global lets tests reset state between cases.
#[derive(Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CachedEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CachedEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached options for `key` if a live entry exists.
    /// An expired entry is evicted on the way out.
    pub fn get(&self, key: &CacheKey, ttl: Duration) -> Option<Vec<SearchOption>> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(ttl) => {
                debug!(source = %key.source, query = %key.query, "Cache hit");
                return Some(entry.options.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(source = %key.source, query = %key.query, "Cache entry expired");
            entries.remove(key);
        }
        None
    }

    /// Store a lookup result under `key`, stamped with the current time.
    pub fn insert(&self, key: CacheKey, options: Vec<SearchOption>) {
        self.lock().insert(key, CachedEntry::new(options));
    }

    /// Drop every entry for every source.
    pub fn clear(&self) {
        self.lock().clear();
        debug!("Result cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
