//! Core type definitions for Eduverse content sync.
//!
//! This crate defines the types shared by the cache, the sync engine and
//! its consumers:
//! - The six content collections and their record id prefixes
//! - The `Dataset` snapshot and its normalization rules
//! - The `SyncStatus` broadcast to subscribers
//!
//! Record contents are opaque to the sync layer. A `Record` is a loosely
//! typed JSON object; only its `id` field is ever interpreted.

mod collection;
mod dataset;
mod status;

pub use collection::Collection;
pub use dataset::{Dataset, Record};
pub use status::{SyncStatus, format_timestamp, parse_timestamp};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
