//! Durable cache layer for Eduverse content sync.
//!
//! The sync engine keeps its offline source of truth in a small synchronous
//! key-value store: the serialized dataset under one key and the last-sync
//! timestamp under another. This crate defines that contract and ships three
//! backends:
//!
//! - [`MemoryCache`]: process-local, for tests and throwaway sessions
//! - [`FileCache`]: one file per key inside a directory
//! - [`SqliteCache`]: a single `kv` table in a SQLite database
//!
//! All backends are `Send + Sync` and cheap to share behind an `Arc`.

mod error;
mod file;
mod memory;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use file::FileCache;
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Host-persistent key-value storage that survives process restarts.
///
/// Operations are synchronous and expected to be fast (local disk at most).
pub trait DurableCache: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
