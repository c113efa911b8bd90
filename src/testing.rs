//! Test support: canned lookup transports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{LookupError, LookupTransport};

/// Transport serving canned payloads, counting every fetch.
///
/// By default each query resolves instantly to a single record labeled
/// `match-<query>`, so tests can assert which query's result landed.
/// Per-query delays simulate slow lookups; the failing flag turns every
/// fetch into a server error.
pub(crate) struct StubTransport {
    pub(crate) calls: AtomicUsize,
    delays: Mutex<HashMap<String, Duration>>,
    payloads: Mutex<HashMap<String, Value>>,
    failing: AtomicBool,
}

impl StubTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delays: Mutex::new(HashMap::new()),
            payloads: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        })
    }

    /// Delay resolution of `query` by `delay`.
    pub(crate) fn delay_query(&self, query: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(query.to_string(), delay);
    }

    /// Serve `payload` for `query` instead of the echo record.
    pub(crate) fn set_payload(&self, query: &str, payload: Value) {
        self.payloads
            .lock()
            .unwrap()
            .insert(query.to_string(), payload);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LookupTransport for StubTransport {
    async fn fetch(
        &self,
        _endpoint: &str,
        query: &str,
        _limit: usize,
    ) -> Result<Value, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(LookupError::ServerError("stub transport failure".to_string()));
        }

        let canned = self.payloads.lock().unwrap().get(query).cloned();
        Ok(canned.unwrap_or_else(|| json!([{ "id": 1, "name": format!("match-{query}") }])))
    }
}
