//! Remote document store abstraction.
//!
//! Defines the contract the sync engine needs from a real-time key-document
//! store: replace or read a document, watch it for changes, stop watching.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Called with the document's new value whenever a watched document changes.
/// `None` means the document does not exist (or was deleted).
pub type DocumentCallback = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Identifies an established watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHandle {
    /// The watched document path.
    pub path: String,
    /// Store-assigned watch id.
    pub id: u64,
}

/// Abstract real-time document store.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Returns the name of the store implementation.
    fn provider_name(&self) -> &'static str;

    /// Replaces the document at `path` with `value`.
    async fn put_document(&self, path: &str, value: &Value) -> SyncResult<()>;

    /// Reads the document at `path`. A missing document is `None`.
    async fn get_document(&self, path: &str) -> SyncResult<Option<Value>>;

    /// Starts watching the document at `path`. `on_change` fires for every
    /// change, whoever made it. Implementations must not invoke `on_change`
    /// from inside this call.
    fn watch_document(&self, path: &str, on_change: DocumentCallback) -> SyncResult<WatchHandle>;

    /// Stops every watch on `path`. Stopping an unwatched path is a no-op.
    fn stop_watching(&self, path: &str);
}
