//! In-memory caching module for lookup results.
//!
//! This module provides the `ResultCache` for memoizing remote lookup
//! responses per `(source, query)` pair. Entries expire after a
//! per-field TTL and are evicted lazily on read.

pub mod store;

pub use store::{CacheKey, ResultCache};
