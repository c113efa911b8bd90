//! Per-field configuration for search-as-you-type lookups.
//!
//! Each selection field is described by a `FieldConfig`: where its options
//! come from (a static list, a remote endpoint, or neither), how eagerly
//! typing triggers a lookup, and how long results may be served from the
//! shared result cache.

use std::fmt;
use std::time::Duration;

use crate::models::{OptionTransform, SearchOption};

/// Minimum query length before a lookup is dispatched.
pub const DEFAULT_MIN_SEARCH_LENGTH: usize = 1;

/// Delay between the last keystroke and the lookup dispatch.
/// 300ms absorbs normal typing bursts without feeling sluggish.
pub const DEFAULT_SEARCH_DELAY: Duration = Duration::from_millis(300);

/// How long cached lookup results stay valid.
/// Reference data changes rarely; 5 minutes keeps dropdowns snappy
/// without serving stale lists all session.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Configuration for one search field instance.
#[derive(Clone)]
pub struct FieldConfig {
    pub min_search_length: usize,
    pub search_delay: Duration,
    pub case_sensitive: bool,
    /// In-memory option list. When set, queries filter this list locally
    /// and `remote_endpoint` is ignored.
    pub static_options: Option<Vec<SearchOption>>,
    pub remote_endpoint: Option<String>,
    /// Payload transform for remote results; `None` uses the default.
    pub transform: Option<OptionTransform>,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            min_search_length: DEFAULT_MIN_SEARCH_LENGTH,
            search_delay: DEFAULT_SEARCH_DELAY,
            case_sensitive: false,
            static_options: None,
            remote_endpoint: None,
            transform: None,
            enable_cache: true,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_search_length(mut self, len: usize) -> Self {
        self.min_search_length = len;
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_static_options(mut self, options: Vec<SearchOption>) -> Self {
        self.static_options = Some(options);
        self
    }

    pub fn with_remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_transform(mut self, transform: OptionTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Enable or disable result caching for this field. Disable for
    /// fields whose results must always be fresh.
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("min_search_length", &self.min_search_length)
            .field("search_delay", &self.search_delay)
            .field("case_sensitive", &self.case_sensitive)
            .field(
                "static_options",
                &self.static_options.as_ref().map(Vec::len),
            )
            .field("remote_endpoint", &self.remote_endpoint)
            .field("transform", &self.transform.is_some())
            .field("enable_cache", &self.enable_cache)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}
