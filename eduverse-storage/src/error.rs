//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be stored by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Another thread panicked while holding the cache lock.
    #[error("cache lock poisoned")]
    LockPoisoned,
}
