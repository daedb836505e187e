//! Offline-first sync engine for Eduverse content.
//!
//! Keeps a local durable cache and a remote real-time document store
//! consistent, survives connectivity loss, and fans every change out to a
//! dynamic set of subscribers.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Engine**: owns connectivity state, the subscriber list and the single
//!   remote watch; mediates every cache and remote access
//! - **Remote**: the [`StoreAdapter`] contract plus in-memory and REST stores
//! - **Connectivity**: the host online/offline signal and a reachability probe
//! - **Editor**: record-level add/update/delete over whole-document writes
//!
//! ## Sync Process
//!
//! 1. **Write**: edits go to the durable cache, then to the remote store if online
//! 2. **Watch**: while anyone is subscribed, remote changes overwrite the cache
//! 3. **Reconnect**: regaining connectivity pushes the cache to the remote store
//! 4. **Notify**: every change is replayed to all subscribers in order
//!
//! # Example
//!
//! ```
//! use eduverse_storage::MemoryCache;
//! use eduverse_sync::{Connectivity, MemoryDocumentStore, SyncEngine};
//! use std::sync::Arc;
//!
//! let engine = SyncEngine::new(
//!     Arc::new(MemoryDocumentStore::new()),
//!     Arc::new(MemoryCache::new()),
//!     Connectivity::new(false),
//! );
//!
//! let subscription = engine.subscribe(|dataset, status| {
//!     println!("{} records, online: {}", dataset.len(), status.online);
//! });
//! subscription.unsubscribe();
//! ```

pub mod connectivity;
pub mod editor;
mod engine;
mod error;
pub mod remote;

pub use connectivity::{Connectivity, ProbeConfig, probe_once, spawn_probe};
pub use editor::ContentEditor;
pub use engine::{Subscriber, Subscription, SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use remote::{
    DocumentCallback, HttpDocumentStore, HttpStoreConfig, MemoryDocumentStore, StoreAdapter,
    WatchHandle,
};
