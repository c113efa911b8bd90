//! Process-wide service wiring.
//!
//! One `SearchContext` is constructed at startup and shared by every
//! mounted field. It owns the result cache, the lookup client, and the
//! shared dataset registry; holding them in one injectable object keeps
//! process-scope state visible and resettable instead of hidden in
//! globals.

use std::sync::Arc;

use crate::api::{LookupClient, LookupError, LookupTransport};
use crate::cache::ResultCache;
use crate::config::FieldConfig;
use crate::field::SearchField;
use crate::shared::SharedDatasetRegistry;

/// Shared services for every search field in the process.
/// Clone is cheap - all services are behind `Arc`.
#[derive(Clone)]
pub struct SearchContext {
    cache: Arc<ResultCache>,
    client: LookupClient,
    shared: Arc<SharedDatasetRegistry>,
}

impl SearchContext {
    /// Create a context with the production HTTP transport.
    pub fn new() -> Result<Self, LookupError> {
        Ok(Self::with_client(LookupClient::new()?))
    }

    /// Create a context over a custom transport.
    pub fn with_transport(transport: Arc<dyn LookupTransport>) -> Self {
        Self::with_client(LookupClient::with_transport(transport))
    }

    fn with_client(client: LookupClient) -> Self {
        Self {
            cache: Arc::new(ResultCache::new()),
            shared: Arc::new(SharedDatasetRegistry::new(client.clone())),
            client,
        }
    }

    /// Mint a handle for one mounted field.
    pub fn field(&self, config: FieldConfig) -> SearchField {
        SearchField::new(config, Arc::clone(&self.cache), self.client.clone())
    }

    /// The process-wide result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The shared reference-dataset registry.
    pub fn shared(&self) -> &SharedDatasetRegistry {
        &self.shared
    }
}
