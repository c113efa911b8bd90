//! Debounced search handle for one mounted field.
//!
//! `SearchField` is the contract handed to presentation code. It owns the
//! query state for one field, delays lookups until typing quiesces, and
//! guarantees that only the most recently submitted query can update
//! consumer-visible state: every submission bumps a generation counter,
//! and a lookup result is applied only if its generation is still
//! current when it lands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::{LookupClient, LookupError};
use crate::cache::ResultCache;
use crate::config::FieldConfig;
use crate::models::SearchOption;
use crate::source::OptionSource;

/// Consumer-visible state of one search field.
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot {
    pub query: String,
    pub options: Vec<SearchOption>,
    pub loading: bool,
    pub error: Option<String>,
}

struct FieldState {
    snapshot: FieldSnapshot,
    /// Token of the lookup allowed to land. Bumped on every submission
    /// and on teardown; results carrying an older token are discarded.
    generation: u64,
    /// Armed debounce timer or in-flight lookup task, if any.
    task: Option<JoinHandle<()>>,
}

struct FieldInner {
    source: OptionSource,
    cache: Arc<ResultCache>,
    search_delay: Duration,
    state: Mutex<FieldState>,
    notify: watch::Sender<FieldSnapshot>,
}

impl FieldInner {
    fn lock(&self) -> MutexGuard<'_, FieldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Mark the lookup for `generation` as dispatched: loading turns on
    /// and a previous error clears, but options stay in place so the
    /// dropdown does not flash empty during a refresh.
    fn begin_fetch(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.snapshot.loading = true;
        state.snapshot.error = None;
        let snapshot = state.snapshot.clone();
        drop(state);
        self.notify.send_replace(snapshot);
    }

    /// Apply a settled lookup, unless a newer submission superseded it.
    fn settle(&self, generation: u64, result: Result<Vec<SearchOption>, LookupError>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                "Discarding superseded lookup result"
            );
            return;
        }
        match result {
            Ok(options) => {
                state.snapshot.options = options;
                state.snapshot.loading = false;
                state.snapshot.error = None;
            }
            Err(err) if err.is_cancellation() => {
                state.snapshot.loading = false;
            }
            Err(err) => {
                state.snapshot.options = Vec::new();
                state.snapshot.loading = false;
                state.snapshot.error = Some(err.to_string());
            }
        }
        let snapshot = state.snapshot.clone();
        drop(state);
        self.notify.send_replace(snapshot);
    }
}

/// Handle for one mounted search field.
///
/// Must be used within a Tokio runtime: query submission arms timers and
/// dispatches lookups on the ambient runtime. Dropping the handle cancels
/// any armed timer and invalidates any in-flight lookup.
pub struct SearchField {
    inner: Arc<FieldInner>,
}

impl SearchField {
    pub(crate) fn new(config: FieldConfig, cache: Arc<ResultCache>, client: LookupClient) -> Self {
        let source = OptionSource::new(&config, Arc::clone(&cache), client);
        let (notify, _) = watch::channel(FieldSnapshot::default());
        Self {
            inner: Arc::new(FieldInner {
                source,
                cache,
                search_delay: config.search_delay,
                state: Mutex::new(FieldState {
                    snapshot: FieldSnapshot::default(),
                    generation: 0,
                    task: None,
                }),
                notify,
            }),
        }
    }

    /// Replace the current query.
    ///
    /// Never fails; empty, unchanged, or rapidly repeated values are all
    /// accepted. Every call restarts the debounce window and supersedes
    /// any lookup still in flight from an earlier submission.
    pub fn set_query(&self, query: &str) {
        self.submit(query, false);
    }

    /// Replay the current query immediately, skipping the debounce timer.
    /// The result cache is still consulted.
    pub fn refetch(&self) {
        let query = self.inner.lock().snapshot.query.clone();
        self.submit(&query, true);
    }

    /// Drop every cached lookup result, for every field sharing the
    /// cache. Current options, loading, and error state are untouched.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn snapshot(&self) -> FieldSnapshot {
        self.inner.lock().snapshot.clone()
    }

    pub fn options(&self) -> Vec<SearchOption> {
        self.inner.lock().snapshot.options.clone()
    }

    pub fn loading(&self) -> bool {
        self.inner.lock().snapshot.loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().snapshot.error.clone()
    }

    pub fn query(&self) -> String {
        self.inner.lock().snapshot.query.clone()
    }

    /// Watch consumer state; the receiver yields a fresh snapshot after
    /// every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<FieldSnapshot> {
        self.inner.notify.subscribe()
    }

    fn submit(&self, query: &str, immediate: bool) {
        let inner = Arc::clone(&self.inner);
        let mut state = self.inner.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.snapshot.query = query.to_string();

        if !self.inner.source.accepts(query) {
            // Below the minimum length: settle to idle without dispatching.
            state.snapshot.options = Vec::new();
            state.snapshot.loading = false;
            state.snapshot.error = None;
            let snapshot = state.snapshot.clone();
            drop(state);
            self.inner.notify.send_replace(snapshot);
            return;
        }

        let delay = if immediate {
            Duration::ZERO
        } else {
            self.inner.search_delay
        };
        let query = query.to_string();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !inner.is_current(generation) {
                return;
            }
            inner.begin_fetch(generation);
            let result = inner.source.resolve(&query).await;
            inner.settle(generation, result);
        });
        state.task = Some(task);
    }
}

impl Drop for SearchField {
    /// Tearing down a field cancels its armed timer and invalidates any
    /// in-flight lookup so late results cannot land.
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}
