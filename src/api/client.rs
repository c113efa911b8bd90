//! Remote lookup client for typeahead endpoints.
//!
//! `LookupClient` issues search queries against configured endpoints and
//! normalizes the payload into options. The HTTP call itself sits behind
//! the `LookupTransport` trait so tests can substitute canned transports;
//! production code uses the `reqwest`-backed `HttpTransport`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{default_transform, OptionTransform, SearchOption};

use super::LookupError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 10s fails fast enough for an interactive field while tolerating slow
/// endpoints.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Fixed page size sent with every lookup.
/// Typeahead dropdowns show a handful of rows; 20 covers them with headroom.
const LOOKUP_PAGE_LIMIT: usize = 20;

/// Transport executing a single lookup request against an endpoint.
///
/// The production implementation is [`HttpTransport`]; tests inject
/// counting stubs to observe and control network behavior.
#[async_trait]
pub trait LookupTransport: Send + Sync {
    /// Fetch the raw JSON payload for `query` from `endpoint`.
    async fn fetch(&self, endpoint: &str, query: &str, limit: usize)
        -> Result<Value, LookupError>;
}

/// Production transport backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LookupTransport for HttpTransport {
    async fn fetch(
        &self,
        endpoint: &str,
        query: &str,
        limit: usize,
    ) -> Result<Value, LookupError> {
        let response = self
            .client
            .get(endpoint)
            .query(&[("search", query), ("limit", &limit.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, %status, "Lookup request failed");
            return Err(LookupError::from_status(status, &body));
        }

        debug!(endpoint, query, "Lookup response received");
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }
}

/// Client resolving typeahead queries through a transport.
#[derive(Clone)]
pub struct LookupClient {
    transport: Arc<dyn LookupTransport>,
}

impl LookupClient {
    /// Create a client with the production HTTP transport.
    pub fn new() -> Result<Self, LookupError> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new()?),
        })
    }

    /// Create a client over a custom transport.
    pub fn with_transport(transport: Arc<dyn LookupTransport>) -> Self {
        Self { transport }
    }

    /// Execute one lookup and normalize the payload into options.
    ///
    /// The transform (caller-supplied or the default) receives the raw
    /// payload and owns envelope handling.
    pub async fn lookup(
        &self,
        endpoint: &str,
        query: &str,
        transform: Option<&OptionTransform>,
    ) -> Result<Vec<SearchOption>, LookupError> {
        let raw = self
            .transport
            .fetch(endpoint, query, LOOKUP_PAGE_LIMIT)
            .await?;
        let options = match transform {
            Some(transform) => transform(&raw),
            None => default_transform(&raw),
        };
        debug!(endpoint, query, count = options.len(), "Lookup resolved");
        Ok(options)
    }
}
