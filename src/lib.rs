//! Typeahead lookup and reference-data caching for form fields.
//!
//! `fieldcache` backs search-as-you-type selection fields: it debounces
//! keystrokes, cancels superseded lookups, resolves queries from a
//! static list or a remote endpoint, memoizes remote results for a
//! bounded time, and coalesces shared reference datasets so N concurrent
//! mounts cost a single network call.
//!
//! - [`SearchContext`]: process-wide wiring (result cache, lookup
//!   client, shared dataset registry). Construct once, share everywhere.
//! - [`SearchField`]: per-mount consumer handle with debounced
//!   [`set_query`](SearchField::set_query), cache-aware
//!   [`refetch`](SearchField::refetch), and a `watch`-based subscription
//!   for reactive rendering.
//! - [`SharedDatasetRegistry`]: single-flight loader with subscriber
//!   fan-out for fixed reference lists used across many fields.
//! - [`ResultCache`]: TTL-bounded memoization keyed by source and
//!   query.
//!
//! Everything above the lookup transport is rendering-agnostic; the
//! crate has no opinion about the widget layer consuming it.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod field;
pub mod models;
pub mod shared;

mod source;
#[cfg(test)]
mod testing;

pub use api::{HttpTransport, LookupClient, LookupError, LookupTransport};
pub use cache::{CacheKey, ResultCache};
pub use config::FieldConfig;
pub use context::SearchContext;
pub use field::{FieldSnapshot, SearchField};
pub use models::{default_transform, OptionId, OptionTransform, SearchOption};
pub use shared::{
    DatasetSpec, SharedDatasetRegistry, SharedSnapshot, SharedSubscription, SubscriberCallback,
};
