//! In-process real-time document store.
//!
//! Several engines may share one `MemoryDocumentStore` to behave like
//! several clients of the same remote database. Writes fire every watcher of
//! the written path synchronously, including the writer's own watch.

use super::store::{DocumentCallback, StoreAdapter, WatchHandle};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    documents: HashMap<String, Value>,
    watchers: HashMap<String, Vec<(u64, DocumentCallback)>>,
}

/// A real-time document store held in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
    next_watch_id: AtomicU64,
    watch_calls: AtomicUsize,
    put_count: AtomicUsize,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    fail_watches: AtomicBool,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following `put_document` fail until reset.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `get_document` fail until reset.
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `watch_document` fail until reset.
    pub fn set_fail_watches(&self, fail: bool) {
        self.fail_watches.store(fail, Ordering::SeqCst);
    }

    /// Current value of a document.
    pub fn document(&self, path: &str) -> Option<Value> {
        self.lock().documents.get(path).cloned()
    }

    /// Number of live watches on `path`.
    pub fn active_watch_count(&self, path: &str) -> usize {
        self.lock().watchers.get(path).map_or(0, Vec::len)
    }

    /// Number of successful `watch_document` calls so far.
    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    /// Number of successful `put_document` calls so far.
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    /// Writes a document as some other client would: no failure injection,
    /// not counted, watchers fire.
    pub fn write_external(&self, path: &str, value: Value) {
        self.store_and_fire(path, value);
    }

    fn store_and_fire(&self, path: &str, value: Value) {
        let callbacks: Vec<DocumentCallback> = {
            let mut state = self.lock();
            state.documents.insert(path.to_string(), value.clone());
            state
                .watchers
                .get(path)
                .map(|w| w.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };

        debug!("Firing {} watcher(s) for {}", callbacks.len(), path);
        for callback in callbacks {
            callback(Some(value.clone()));
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryDocumentStore {
    fn provider_name(&self) -> &'static str {
        "Memory"
    }

    async fn put_document(&self, path: &str, value: &Value) -> SyncResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(SyncError::Network("remote store unavailable".to_string()));
        }
        self.put_count.fetch_add(1, Ordering::SeqCst);
        self.store_and_fire(path, value.clone());
        Ok(())
    }

    async fn get_document(&self, path: &str) -> SyncResult<Option<Value>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(SyncError::Network("remote store unavailable".to_string()));
        }
        Ok(self.document(path))
    }

    fn watch_document(&self, path: &str, on_change: DocumentCallback) -> SyncResult<WatchHandle> {
        if self.fail_watches.load(Ordering::SeqCst) {
            return Err(SyncError::Watch(format!("cannot watch {path}")));
        }
        let id = self.next_watch_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock()
            .watchers
            .entry(path.to_string())
            .or_default()
            .push((id, on_change));
        self.watch_calls.fetch_add(1, Ordering::SeqCst);

        Ok(WatchHandle {
            path: path.to_string(),
            id,
        })
    }

    fn stop_watching(&self, path: &str) {
        if let Some(removed) = self.lock().watchers.remove(path) {
            debug!("Stopped {} watch(es) on {}", removed.len(), path);
        }
    }
}
