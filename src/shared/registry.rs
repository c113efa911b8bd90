//! Shared dataset registry with single-flight loading.
//!
//! Fixed reference lists are needed identically by many simultaneously
//! mounted fields. Rather than one debounced lookup per mount, the
//! registry loads each dataset once and fans the outcome out to every
//! subscriber: N concurrent mounts cost at most one network call. A
//! subscriber arriving while a load is in flight attaches to that load
//! instead of starting a second one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::{LookupClient, LookupError};
use crate::config::DEFAULT_CACHE_TTL;
use crate::models::{OptionTransform, SearchOption};

/// Specification of one shared reference dataset.
#[derive(Clone)]
pub struct DatasetSpec {
    /// Caller-chosen identifier. Datasets are keyed by this, not by
    /// endpoint, so one endpoint may back several transformed datasets.
    pub id: String,
    pub endpoint: String,
    pub transform: Option<OptionTransform>,
    pub ttl: Duration,
}

impl DatasetSpec {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            transform: None,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_transform(mut self, transform: OptionTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// State of a shared dataset as observed by subscribers.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    pub options: Vec<SearchOption>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Callback invoked with every broadcast snapshot.
pub type SubscriberCallback = Arc<dyn Fn(&SharedSnapshot) + Send + Sync>;

struct DatasetState {
    options: Vec<SearchOption>,
    loaded_at: Option<DateTime<Utc>>,
    loading: bool,
    error: Option<String>,
    /// Token of the load allowed to land; bumped by every (re)load.
    epoch: u64,
}

struct SharedDataset {
    id: String,
    endpoint: String,
    transform: Option<OptionTransform>,
    ttl: Duration,
    client: LookupClient,
    state: Mutex<DatasetState>,
    subscribers: Mutex<HashMap<u64, SubscriberCallback>>,
    next_subscriber: AtomicU64,
}

impl SharedDataset {
    fn new(spec: DatasetSpec, client: LookupClient) -> Self {
        Self {
            id: spec.id,
            endpoint: spec.endpoint,
            transform: spec.transform,
            ttl: spec.ttl,
            client,
            state: Mutex::new(DatasetState {
                options: Vec::new(),
                loaded_at: None,
                loading: false,
                error: None,
                epoch: 0,
            }),
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DatasetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<u64, SubscriberCallback>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(state: &DatasetState) -> SharedSnapshot {
        SharedSnapshot {
            options: state.options.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    fn snapshot(&self) -> SharedSnapshot {
        Self::snapshot_of(&self.lock_state())
    }

    fn is_fresh(&self, state: &DatasetState) -> bool {
        match state.loaded_at {
            Some(loaded_at) => {
                let age = Utc::now() - loaded_at;
                age.num_milliseconds() < 0
                    || (age.num_milliseconds() as u128) < self.ttl.as_millis()
            }
            None => false,
        }
    }

    /// Register a subscriber and trigger a load if the dataset has no
    /// live data and none is in flight.
    fn attach(self: &Arc<Self>, callback: SubscriberCallback) -> u64 {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.lock_subscribers().insert(id, Arc::clone(&callback));

        let load_epoch = {
            let mut state = self.lock_state();
            if state.loading || self.is_fresh(&state) {
                None
            } else {
                state.loading = true;
                state.error = None;
                state.epoch += 1;
                Some(state.epoch)
            }
        };

        match load_epoch {
            Some(epoch) => {
                // The loading transition reaches everyone, including the
                // subscriber that just triggered it.
                self.broadcast(&self.snapshot());
                self.spawn_load(epoch);
            }
            None => {
                // Fresh data or an in-flight load: replay current state to
                // the newcomer so it observes the same sequence as earlier
                // mounts.
                callback(&self.snapshot());
            }
        }
        id
    }

    /// Idempotent: detaching an unknown or already-removed id is a no-op.
    fn detach(&self, id: u64) {
        self.lock_subscribers().remove(&id);
    }

    /// Invalidate current state and force a new load.
    fn refetch(self: &Arc<Self>) {
        let (snapshot, epoch) = {
            let mut state = self.lock_state();
            state.loading = true;
            state.error = None;
            state.loaded_at = None;
            state.epoch += 1;
            (Self::snapshot_of(&state), state.epoch)
        };
        self.broadcast(&snapshot);
        self.spawn_load(epoch);
    }

    fn spawn_load(self: &Arc<Self>, epoch: u64) {
        let dataset = Arc::clone(self);
        tokio::spawn(async move {
            debug!(dataset = %dataset.id, "Loading shared dataset");
            let result = dataset
                .client
                .lookup(&dataset.endpoint, "", dataset.transform.as_ref())
                .await;
            dataset.finish_load(epoch, result);
        });
    }

    fn finish_load(&self, epoch: u64, result: Result<Vec<SearchOption>, LookupError>) {
        let snapshot = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                debug!(dataset = %self.id, "Discarding superseded dataset load");
                return;
            }
            state.loading = false;
            match result {
                Ok(options) => {
                    debug!(dataset = %self.id, count = options.len(), "Shared dataset loaded");
                    state.options = options;
                    state.loaded_at = Some(Utc::now());
                    state.error = None;
                }
                Err(err) if err.is_cancellation() => {}
                Err(err) => {
                    // Keep the last-known-good list; a failed refresh must
                    // not regress subscribers to an empty dropdown.
                    warn!(dataset = %self.id, error = %err, "Shared dataset load failed");
                    state.error = Some(err.to_string());
                }
            }
            Self::snapshot_of(&state)
        };
        self.broadcast(&snapshot);
    }

    fn broadcast(&self, snapshot: &SharedSnapshot) {
        let targets: Vec<(u64, SubscriberCallback)> = self
            .lock_subscribers()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();
        for (id, callback) in targets {
            // A subscriber may detach between collection and delivery;
            // re-check membership so removal always wins.
            let still_registered = self.lock_subscribers().contains_key(&id);
            if still_registered {
                callback(snapshot);
            }
        }
    }
}

/// Registry of shared datasets, one per dataset identifier.
///
/// Constructed once and shared by reference; datasets live for the life
/// of the registry and are bounded only by TTL staleness.
pub struct SharedDatasetRegistry {
    client: LookupClient,
    datasets: Mutex<HashMap<String, Arc<SharedDataset>>>,
}

impl SharedDatasetRegistry {
    pub fn new(client: LookupClient) -> Self {
        Self {
            client,
            datasets: Mutex::new(HashMap::new()),
        }
    }

    fn lock_datasets(&self) -> MutexGuard<'_, HashMap<String, Arc<SharedDataset>>> {
        self.datasets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to a shared dataset, creating it on first use.
    ///
    /// The callback fires with the state transition this subscription
    /// observes on attach (current data, or the loading transition it
    /// just triggered) and again on every later change. Dropping the
    /// returned handle detaches the subscriber.
    pub fn subscribe(&self, spec: DatasetSpec, callback: SubscriberCallback) -> SharedSubscription {
        let dataset = self.dataset_for(spec);
        let id = dataset.attach(callback);
        SharedSubscription { dataset, id }
    }

    fn dataset_for(&self, spec: DatasetSpec) -> Arc<SharedDataset> {
        let mut datasets = self.lock_datasets();
        if let Some(existing) = datasets.get(&spec.id) {
            return Arc::clone(existing);
        }
        let dataset = Arc::new(SharedDataset::new(spec, self.client.clone()));
        datasets.insert(dataset.id.clone(), Arc::clone(&dataset));
        dataset
    }

    /// Force a reload of `id`, broadcasting to all its subscribers.
    /// Unknown ids are ignored.
    pub fn refetch(&self, id: &str) {
        let dataset = self.lock_datasets().get(id).cloned();
        if let Some(dataset) = dataset {
            dataset.refetch();
        }
    }

    /// Current snapshot of `id`, if the dataset exists.
    pub fn snapshot(&self, id: &str) -> Option<SharedSnapshot> {
        self.lock_datasets().get(id).map(|d| d.snapshot())
    }
}

/// Live membership of one subscriber in a shared dataset.
///
/// Dropping the handle detaches the subscriber; a subscriber that leaves
/// mid-load receives no further callbacks.
pub struct SharedSubscription {
    dataset: Arc<SharedDataset>,
    id: u64,
}

impl SharedSubscription {
    pub fn snapshot(&self) -> SharedSnapshot {
        self.dataset.snapshot()
    }

    /// Detach explicitly. Equivalent to dropping the handle.
    pub fn detach(self) {}
}

impl Drop for SharedSubscription {
    fn drop(&mut self) {
        self.dataset.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::time::sleep;

    use super::*;
    use crate::testing::StubTransport;

    /// Recorder collecting every snapshot a subscriber observes.
    fn recorder() -> (Arc<StdMutex<Vec<SharedSnapshot>>>, SubscriberCallback) {
        let seen: Arc<StdMutex<Vec<SharedSnapshot>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: SubscriberCallback =
            Arc::new(move |snapshot| sink.lock().unwrap().push(snapshot.clone()));
        (seen, callback)
    }

    fn registry(transport: &Arc<StubTransport>) -> Arc<SharedDatasetRegistry> {
        Arc::new(SharedDatasetRegistry::new(LookupClient::with_transport(
            Arc::clone(transport) as _,
        )))
    }

    fn positions_spec() -> DatasetSpec {
        DatasetSpec::new("positions", "/api/positions")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_mounts_share_one_load() {
        let transport = StubTransport::new();
        transport.delay_query("", Duration::from_millis(60));
        let registry = registry(&transport);

        let mut recorders = Vec::new();
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let (seen, callback) = recorder();
            recorders.push(seen);
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.subscribe(positions_spec(), callback)
            }));
        }
        let subscriptions: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|s| s.unwrap())
            .collect();
        sleep(Duration::from_millis(200)).await;

        assert_eq!(transport.call_count(), 1);
        for seen in &recorders {
            let seen = seen.lock().unwrap();
            // Everyone observed the loading transition and the same final
            // data, regardless of subscription order.
            assert!(seen.first().unwrap().loading);
            let last = seen.last().unwrap();
            assert!(!last.loading);
            assert!(last.error.is_none());
            assert_eq!(last.options[0].label, "match-");
        }
        drop(subscriptions);
    }

    #[tokio::test]
    async fn test_mid_load_subscriber_receives_final_broadcast() {
        let transport = StubTransport::new();
        transport.delay_query("", Duration::from_millis(80));
        let registry = registry(&transport);

        let (_first_seen, first_callback) = recorder();
        let _first = registry.subscribe(positions_spec(), first_callback);
        sleep(Duration::from_millis(30)).await;

        // Joins while the load is still in flight.
        let (late_seen, late_callback) = recorder();
        let _late = registry.subscribe(positions_spec(), late_callback);
        sleep(Duration::from_millis(150)).await;

        assert_eq!(transport.call_count(), 1);
        let late_seen = late_seen.lock().unwrap();
        assert!(late_seen.first().unwrap().loading);
        assert!(!late_seen.last().unwrap().loading);
        assert_eq!(late_seen.last().unwrap().options.len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_subscriber_is_served_from_cache() {
        let transport = StubTransport::new();
        let registry = registry(&transport);

        let (_seen, callback) = recorder();
        let _first = registry.subscribe(positions_spec(), callback);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.call_count(), 1);

        let (late_seen, late_callback) = recorder();
        let _late = registry.subscribe(positions_spec(), late_callback);
        sleep(Duration::from_millis(50)).await;

        // No second network call; the newcomer got the cached data
        // immediately.
        assert_eq!(transport.call_count(), 1);
        let late_seen = late_seen.lock().unwrap();
        assert_eq!(late_seen.len(), 1);
        assert!(!late_seen[0].loading);
        assert_eq!(late_seen[0].options.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_dataset_reloads_for_new_subscriber() {
        let transport = StubTransport::new();
        let registry = registry(&transport);
        let spec = positions_spec().with_ttl(Duration::from_millis(40));

        let (_seen, callback) = recorder();
        let _first = registry.subscribe(spec.clone(), callback);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.call_count(), 1);

        let (_late_seen, late_callback) = recorder();
        let _late = registry.subscribe(spec, late_callback);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_refetch_reloads_and_rebroadcasts() {
        let transport = StubTransport::new();
        let registry = registry(&transport);

        let (seen, callback) = recorder();
        let _sub = registry.subscribe(positions_spec(), callback);
        sleep(Duration::from_millis(50)).await;

        registry.refetch("positions");
        sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.call_count(), 2);
        let seen = seen.lock().unwrap();
        // load, loaded, refetch-loading, reloaded
        assert!(seen.len() >= 4);
        assert!(seen[seen.len() - 2].loading);
        assert!(!seen.last().unwrap().loading);
    }

    #[tokio::test]
    async fn test_refetch_of_unknown_dataset_is_a_noop() {
        let transport = StubTransport::new();
        let registry = registry(&transport);
        registry.refetch("nope");
        assert!(registry.snapshot("nope").is_none());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_refetch_preserves_last_known_good_data() {
        let transport = StubTransport::new();
        let registry = registry(&transport);

        let (_seen, callback) = recorder();
        let sub = registry.subscribe(positions_spec(), callback);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(sub.snapshot().options.len(), 1);

        transport.set_failing(true);
        registry.refetch("positions");
        sleep(Duration::from_millis(50)).await;

        // Stale-but-valid data with the error flag set, not an empty list.
        let snapshot = sub.snapshot();
        assert_eq!(snapshot.options.len(), 1);
        assert!(!snapshot.loading);
        assert!(snapshot
            .error
            .as_deref()
            .unwrap()
            .contains("stub transport failure"));
    }

    #[tokio::test]
    async fn test_unsubscribed_mid_load_receives_no_final_callback() {
        let transport = StubTransport::new();
        transport.delay_query("", Duration::from_millis(100));
        let registry = registry(&transport);

        let (gone_seen, gone_callback) = recorder();
        let gone = registry.subscribe(positions_spec(), gone_callback);
        let (kept_seen, kept_callback) = recorder();
        let _kept = registry.subscribe(positions_spec(), kept_callback);

        sleep(Duration::from_millis(30)).await;
        drop(gone);
        sleep(Duration::from_millis(150)).await;

        // The departed subscriber saw only the loading transition; the
        // survivor got the completed data.
        let gone_seen = gone_seen.lock().unwrap();
        assert_eq!(gone_seen.len(), 1);
        assert!(gone_seen[0].loading);
        let kept_seen = kept_seen.lock().unwrap();
        assert!(!kept_seen.last().unwrap().loading);
        assert_eq!(kept_seen.last().unwrap().options.len(), 1);
    }

    #[tokio::test]
    async fn test_datasets_are_keyed_by_id_not_endpoint() {
        let transport = StubTransport::new();
        let registry = registry(&transport);

        let (_a_seen, a_callback) = recorder();
        let _a = registry.subscribe(DatasetSpec::new("roles", "/api/ref"), a_callback);
        let (_b_seen, b_callback) = recorder();
        let _b = registry.subscribe(DatasetSpec::new("teams", "/api/ref"), b_callback);
        sleep(Duration::from_millis(80)).await;

        // Same endpoint, two dataset identities, two loads.
        assert_eq!(transport.call_count(), 2);
        assert!(registry.snapshot("roles").is_some());
        assert!(registry.snapshot("teams").is_some());
    }
}
