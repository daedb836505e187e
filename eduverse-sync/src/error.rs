//! Error types for the sync layer.

use eduverse_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (remote unreachable, request failed).
    #[error("network error: {0}")]
    Network(String),

    /// The remote store answered with a non-success status.
    #[error("remote store returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dataset or record error.
    #[error("data error: {0}")]
    Data(#[from] eduverse_types::Error),

    /// Durable cache error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Watch could not be established.
    #[error("watch error: {0}")]
    Watch(String),

    /// No tokio runtime available to drive background work.
    #[error("runtime error: {0}")]
    Runtime(String),
}
