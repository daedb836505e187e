//! Remote document stores for sync.
//!
//! The engine talks to the authoritative copy of the dataset through the
//! [`StoreAdapter`] trait. Two implementations ship with the crate: an
//! in-process store and a realtime-database REST client.

pub mod http;
pub mod memory;
pub mod store;

pub use http::{HttpDocumentStore, HttpStoreConfig};
pub use memory::MemoryDocumentStore;
pub use store::{DocumentCallback, StoreAdapter, WatchHandle};
