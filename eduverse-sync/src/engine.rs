//! Sync engine: offline-first mediation between the durable cache and the
//! remote store.
//!
//! Every edit lands in the durable cache first and is forwarded to the remote
//! store only while online. Remote changes overwrite the cache wholesale.
//! Subscribers are told about both, synchronously and in registration order.
//!
//! Two locks guard the engine. `delivery` (reentrant) is held while callbacks
//! run, so a subscriber never sees an older snapshot after a newer one.
//! `state` guards subscribers, status and the watch slot and is never held
//! while callbacks run. `delivery` is always taken before `state`.

use crate::connectivity::Connectivity;
use crate::error::{SyncError, SyncResult};
use crate::remote::{DocumentCallback, StoreAdapter, WatchHandle};
use chrono::{DateTime, Utc};
use eduverse_storage::DurableCache;
use eduverse_types::{Dataset, SyncStatus, format_timestamp, parse_timestamp};
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Path of the dataset document in the remote store.
    pub document_path: String,
    /// Cache key holding the serialized dataset.
    pub data_key: String,
    /// Cache key holding the last successful sync time.
    pub last_sync_key: String,
    /// Seed `lastSynced` from the cache on construction.
    pub restore_last_synced: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            document_path: "data".to_string(),
            data_key: "eduverse_data".to_string(),
            last_sync_key: "eduverse_last_sync".to_string(),
            restore_last_synced: true,
        }
    }
}

/// A change listener. Receives the full dataset and the shared status.
pub type Subscriber = Arc<dyn Fn(&Dataset, &SyncStatus) + Send + Sync>;

struct EngineState {
    online: bool,
    status: SyncStatus,
    subscribers: Vec<(u64, Subscriber)>,
    next_subscriber_id: u64,
    /// Active remote watch and the token its callback was created with.
    watch: Option<(u64, WatchHandle)>,
    next_watch_token: u64,
}

impl EngineState {
    fn snapshot_subscribers(&self) -> Vec<Subscriber> {
        self.subscribers.iter().map(|(_, s)| s.clone()).collect()
    }
}

struct EngineInner {
    config: SyncConfig,
    store: Arc<dyn StoreAdapter>,
    cache: Arc<dyn DurableCache>,
    connectivity: Connectivity,
    delivery: ReentrantMutex<()>,
    state: Mutex<EngineState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// The sync engine. Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Creates an engine with the default configuration.
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        cache: Arc<dyn DurableCache>,
        connectivity: Connectivity,
    ) -> Self {
        Self::with_config(SyncConfig::default(), store, cache, connectivity)
    }

    /// Creates an engine with a custom configuration.
    pub fn with_config(
        config: SyncConfig,
        store: Arc<dyn StoreAdapter>,
        cache: Arc<dyn DurableCache>,
        connectivity: Connectivity,
    ) -> Self {
        let online = connectivity.is_online();
        let mut status = SyncStatus::new(online);
        if config.restore_last_synced {
            if let Some(at) = restore_last_synced(cache.as_ref(), &config.last_sync_key) {
                status.mark_synced(at);
            }
        }

        Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                cache,
                connectivity,
                delivery: ReentrantMutex::new(()),
                state: Mutex::new(EngineState {
                    online,
                    status,
                    subscribers: Vec::new(),
                    next_subscriber_id: 0,
                    watch: None,
                    next_watch_token: 0,
                }),
                listener: Mutex::new(None),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns the connectivity signal the engine follows.
    pub fn connectivity(&self) -> &Connectivity {
        &self.inner.connectivity
    }

    /// Name of the remote store implementation.
    pub fn provider_name(&self) -> &'static str {
        self.inner.store.provider_name()
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.lock_state().status
    }

    /// Whether the engine currently considers itself online.
    pub fn is_online(&self) -> bool {
        self.lock_state().online
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock_state().subscribers.len()
    }

    /// Whether a remote watch is established.
    pub fn has_active_watch(&self) -> bool {
        self.lock_state().watch.is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Starts following the connectivity signal. Idempotent.
    pub fn start(&self) -> SyncResult<()> {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::Runtime(format!("engine needs a tokio runtime: {e}")))?;
        let mut rx = self.inner.connectivity.subscribe();
        let initial = *rx.borrow_and_update();
        let weak = Arc::downgrade(&self.inner);

        *listener = Some(runtime.spawn(async move {
            // The signal may have moved between construction and start.
            if let Some(inner) = weak.upgrade() {
                SyncEngine { inner }.handle_connectivity_change(initial).await;
            }
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                let Some(inner) = weak.upgrade() else { break };
                SyncEngine { inner }.handle_connectivity_change(online).await;
            }
            debug!("Connectivity listener stopped");
        }));

        info!(
            "Sync engine started ({}, {})",
            self.provider_name(),
            if initial { "online" } else { "offline" }
        );
        Ok(())
    }

    /// Stops the connectivity listener, drops every subscriber and tears
    /// down the remote watch. The engine may be started again afterwards.
    pub fn dispose(&self) {
        if let Some(task) = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }

        let mut state = self.lock_state();
        state.subscribers.clear();
        self.stop_watch(&mut state);
        info!("Sync engine disposed");
    }

    // ── Consumer API ─────────────────────────────────────────────

    /// Registers `callback` and immediately replays the cached dataset to it.
    ///
    /// While online, the first subscriber also establishes the remote watch.
    /// Keep the returned [`Subscription`] and call
    /// [`unsubscribe`](Subscription::unsubscribe) to stop receiving updates.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Dataset, &SyncStatus) + Send + Sync + 'static,
    {
        let subscriber: Subscriber = Arc::new(callback);
        let _delivery = self.inner.delivery.lock();

        let (id, dataset, status) = {
            let mut state = self.lock_state();
            state.next_subscriber_id += 1;
            let id = state.next_subscriber_id;
            state.subscribers.push((id, subscriber.clone()));
            self.ensure_watch(&mut state);
            debug!("Subscriber {} registered ({} total)", id, state.subscribers.len());
            (id, self.read(), state.status)
        };

        subscriber(&dataset, &status);

        Subscription {
            engine: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Reads the cached dataset. Missing or unreadable cache contents yield
    /// an empty dataset.
    pub fn read(&self) -> Dataset {
        match self.inner.cache.get(&self.inner.config.data_key) {
            Ok(Some(raw)) => Dataset::from_json_str(&raw).unwrap_or_else(|e| {
                warn!("Error reading from local cache: {}", e);
                Dataset::new()
            }),
            Ok(None) => Dataset::new(),
            Err(e) => {
                warn!("Error reading from local cache: {}", e);
                Dataset::new()
            }
        }
    }

    /// Persists `dataset` locally, forwards it to the remote store when
    /// online, and notifies every subscriber.
    ///
    /// Returns `false` if the edit is not known to be stored remotely. When
    /// only the remote step failed the cache still holds the edit, and it is
    /// pushed again on the next reconnection.
    pub async fn write(&self, dataset: &Dataset) -> bool {
        match self.try_write(dataset).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error updating data: {}", e);
                false
            }
        }
    }

    async fn try_write(&self, dataset: &Dataset) -> SyncResult<()> {
        let serialized = dataset.to_json_string()?;
        let online = {
            let state = self.lock_state();
            self.inner.cache.set(&self.inner.config.data_key, &serialized)?;
            state.online
        };

        let pushed = if online {
            self.push(dataset).await
        } else {
            debug!("Offline; write kept in local cache only");
            Ok(())
        };

        self.notify(dataset);
        pushed
    }

    /// Pushes the cached dataset to the remote store wholesale and
    /// re-establishes the remote watch. Returns whether the push succeeded.
    pub async fn resync(&self) -> bool {
        if !self.is_online() {
            debug!("Skipping resync while offline");
            return false;
        }

        let dataset = self.read();
        match self.push(&dataset).await {
            Ok(()) => {
                info!(
                    "Resynchronized {} records with {}",
                    dataset.len(),
                    self.provider_name()
                );
                self.ensure_watch(&mut self.lock_state());
                true
            }
            Err(e) => {
                error!("Error syncing with remote store: {}", e);
                false
            }
        }
    }

    /// Reads the remote document and adopts it as the local dataset, the
    /// same way a watch delivery does. Local edits not yet pushed are
    /// replaced. Returns whether the read succeeded.
    pub async fn pull(&self) -> bool {
        if !self.is_online() {
            debug!("Skipping pull while offline");
            return false;
        }

        match self
            .inner
            .store
            .get_document(&self.inner.config.document_path)
            .await
        {
            Ok(payload) => {
                self.apply_remote(None, payload);
                true
            }
            Err(e) => {
                error!("Error reading from remote store: {}", e);
                false
            }
        }
    }

    // ── Event handlers ───────────────────────────────────────────

    /// Reacts to the host connectivity signal.
    ///
    /// Going online resynchronizes before subscribers hear about it; going
    /// offline only notifies. Repeated readings are ignored.
    pub async fn handle_connectivity_change(&self, online: bool) {
        let was_online = {
            let mut state = self.lock_state();
            let was_online = state.online;
            state.online = online;
            state.status.online = online;
            was_online
        };
        if was_online == online {
            debug!("Connectivity unchanged ({})", online);
            return;
        }

        if online {
            info!("Back online, resynchronizing");
            self.resync().await;
        } else {
            info!("Offline; edits will be kept in the local cache");
        }

        let dataset = self.read();
        self.notify(&dataset);
    }

    fn handle_remote_change(&self, token: u64, payload: Option<Value>) {
        self.apply_remote(Some(token), payload);
    }

    /// Overwrites the cache with a remote value and notifies on change.
    /// `watch` is the token of the delivering watch, `None` for a direct read.
    fn apply_remote(&self, watch: Option<u64>, payload: Option<Value>) {
        let incoming = payload.as_ref().map(Dataset::normalize).unwrap_or_default();
        let _delivery = self.inner.delivery.lock();

        let (status, subscribers) = {
            let mut state = self.lock_state();
            if let Some(token) = watch {
                if state.watch.as_ref().map(|(t, _)| *t) != Some(token) {
                    debug!("Ignoring change from stale watch {}", token);
                    return;
                }
            }

            let changed = self.read() != incoming;
            if changed {
                match incoming.to_json_string() {
                    Ok(serialized) => {
                        if let Err(e) = self.inner.cache.set(&self.inner.config.data_key, &serialized) {
                            warn!("Failed to cache remote change: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to serialize remote change: {}", e),
                }
            }
            self.record_sync(&mut state, Utc::now());

            if !changed {
                debug!("Remote document matches local cache");
                return;
            }
            (state.status, state.snapshot_subscribers())
        };

        debug!("Remote change: {} records", incoming.len());
        for subscriber in subscribers {
            subscriber(&incoming, &status);
        }
    }

    // ── Internals ────────────────────────────────────────────────

    async fn push(&self, dataset: &Dataset) -> SyncResult<()> {
        let value = dataset.to_value()?;
        self.inner
            .store
            .put_document(&self.inner.config.document_path, &value)
            .await?;
        self.record_sync(&mut self.lock_state(), Utc::now());
        Ok(())
    }

    fn record_sync(&self, state: &mut EngineState, at: DateTime<Utc>) {
        state.status.mark_synced(at);
        if let Err(e) = self
            .inner
            .cache
            .set(&self.inner.config.last_sync_key, &format_timestamp(at))
        {
            warn!("Failed to persist last sync time: {}", e);
        }
    }

    fn notify(&self, dataset: &Dataset) {
        let _delivery = self.inner.delivery.lock();
        let (status, subscribers) = {
            let state = self.lock_state();
            (state.status, state.snapshot_subscribers())
        };
        for subscriber in subscribers {
            subscriber(dataset, &status);
        }
    }

    /// Establishes the remote watch if online, subscribed and not watching.
    fn ensure_watch(&self, state: &mut EngineState) {
        if !state.online || state.subscribers.is_empty() || state.watch.is_some() {
            return;
        }

        state.next_watch_token += 1;
        let token = state.next_watch_token;
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        let on_change: DocumentCallback = Arc::new(move |payload| {
            if let Some(inner) = weak.upgrade() {
                SyncEngine { inner }.handle_remote_change(token, payload);
            }
        });

        match self
            .inner
            .store
            .watch_document(&self.inner.config.document_path, on_change)
        {
            Ok(handle) => {
                debug!("Watching remote document {} (watch {})", handle.path, handle.id);
                state.watch = Some((token, handle));
            }
            Err(e) => warn!("Failed to watch remote document: {}", e),
        }
    }

    fn stop_watch(&self, state: &mut EngineState) {
        if let Some((_, handle)) = state.watch.take() {
            self.inner.store.stop_watching(&handle.path);
            debug!("Stopped remote watch {}", handle.id);
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.lock_state();
        let before = state.subscribers.len();
        state.subscribers.retain(|(sid, _)| *sid != id);
        if state.subscribers.len() == before {
            return;
        }
        debug!("Subscriber {} removed ({} left)", id, state.subscribers.len());
        if state.subscribers.is_empty() {
            self.stop_watch(&mut state);
        }
    }
}

fn restore_last_synced(cache: &dyn DurableCache, key: &str) -> Option<DateTime<Utc>> {
    let raw = match cache.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Failed to read last sync time: {}", e);
            return None;
        }
    };
    parse_timestamp(&raw)
        .map_err(|e| warn!("Ignoring stored last sync time: {}", e))
        .ok()
}

/// Registration handle returned by [`SyncEngine::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[must_use = "keep the subscription to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    engine: Weak<EngineInner>,
    id: u64,
}

impl Subscription {
    /// The subscriber id, unique per engine.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes the subscriber. The last one out tears down the remote watch.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.engine.upgrade() {
            SyncEngine { inner }.unsubscribe(self.id);
        }
    }
}
