//! Source adapter: resolves a query string into options.
//!
//! Exactly one variant is active per field: a static in-memory list
//! filtered locally, or a remote endpoint consulted through the result
//! cache. A field configured with neither resolves every query to an
//! empty list rather than failing.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{LookupClient, LookupError};
use crate::cache::{CacheKey, ResultCache};
use crate::config::FieldConfig;
use crate::models::{OptionTransform, SearchOption};

enum SourceKind {
    Static(Vec<SearchOption>),
    Remote(String),
    Disabled,
}

/// Adapter resolving queries for one field.
pub(crate) struct OptionSource {
    kind: SourceKind,
    min_search_length: usize,
    case_sensitive: bool,
    enable_cache: bool,
    cache_ttl: Duration,
    transform: Option<OptionTransform>,
    cache: Arc<ResultCache>,
    client: LookupClient,
}

impl OptionSource {
    pub(crate) fn new(
        config: &FieldConfig,
        cache: Arc<ResultCache>,
        client: LookupClient,
    ) -> Self {
        // A static list wins when both are configured; the adapter is
        // never both.
        let kind = match (&config.static_options, &config.remote_endpoint) {
            (Some(options), _) => SourceKind::Static(options.clone()),
            (None, Some(endpoint)) => SourceKind::Remote(endpoint.clone()),
            (None, None) => SourceKind::Disabled,
        };
        Self {
            kind,
            min_search_length: config.min_search_length,
            case_sensitive: config.case_sensitive,
            enable_cache: config.enable_cache,
            cache_ttl: config.cache_ttl,
            transform: config.transform.clone(),
            cache,
            client,
        }
    }

    /// True when `query` is long enough to dispatch a lookup.
    ///
    /// With a threshold of zero the empty query qualifies, so a static
    /// list returns in full before the user has typed anything.
    pub(crate) fn accepts(&self, query: &str) -> bool {
        query.chars().count() >= self.min_search_length
    }

    /// Resolve `query` into options.
    pub(crate) async fn resolve(&self, query: &str) -> Result<Vec<SearchOption>, LookupError> {
        if !self.accepts(query) {
            return Ok(Vec::new());
        }
        match &self.kind {
            SourceKind::Disabled => Ok(Vec::new()),
            SourceKind::Static(options) => Ok(self.filter_static(options, query)),
            SourceKind::Remote(endpoint) => self.resolve_remote(endpoint, query).await,
        }
    }

    fn filter_static(&self, options: &[SearchOption], query: &str) -> Vec<SearchOption> {
        options
            .iter()
            .filter(|option| self.matches(option, query))
            .cloned()
            .collect()
    }

    /// Substring match over label and description.
    fn matches(&self, option: &SearchOption, query: &str) -> bool {
        if self.case_sensitive {
            option.label.contains(query)
                || option
                    .description
                    .as_deref()
                    .map(|d| d.contains(query))
                    .unwrap_or(false)
        } else {
            let needle = query.to_lowercase();
            option.label.to_lowercase().contains(&needle)
                || option
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(&needle))
                    .unwrap_or(false)
        }
    }

    async fn resolve_remote(
        &self,
        endpoint: &str,
        query: &str,
    ) -> Result<Vec<SearchOption>, LookupError> {
        let key = CacheKey::new(endpoint, query);
        if self.enable_cache {
            if let Some(options) = self.cache.get(&key, self.cache_ttl) {
                return Ok(options);
            }
        }
        let options = self
            .client
            .lookup(endpoint, query, self.transform.as_ref())
            .await?;
        if self.enable_cache {
            self.cache.insert(key, options.clone());
        }
        Ok(options)
    }
}
