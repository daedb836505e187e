//! Record-level editing on top of whole-document writes.
//!
//! Each edit reads the cached dataset, changes one record and writes the
//! entire document back through the engine. Concurrent editors on other
//! clients can overwrite each other (last write wins).

use crate::engine::SyncEngine;
use eduverse_types::{Collection, Record};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Add/update/delete helpers for the content collections.
#[derive(Clone)]
pub struct ContentEditor {
    engine: SyncEngine,
}

impl ContentEditor {
    /// Creates an editor writing through `engine`.
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Adds a record. The returned flag is the result of the write.
    pub async fn add(&self, collection: Collection, fields: Map<String, Value>) -> (Record, bool) {
        let mut dataset = self.engine.read();
        let record = dataset.add_record(collection, fields);
        info!("Adding {} {}", collection.id_prefix(), record.id().unwrap_or_default());
        let written = self.engine.write(&dataset).await;
        (record, written)
    }

    /// Shallow-merges `updates` into the record with `id`.
    /// Returns false without writing when no such record exists.
    pub async fn update(&self, collection: Collection, id: &str, updates: Map<String, Value>) -> bool {
        let mut dataset = self.engine.read();
        if !dataset.update_record(collection, id, &updates) {
            warn!("No {} with id {}", collection.id_prefix(), id);
            return false;
        }
        self.engine.write(&dataset).await
    }

    /// Deletes the record with `id`.
    /// Returns false without writing when no such record exists.
    pub async fn delete(&self, collection: Collection, id: &str) -> bool {
        let mut dataset = self.engine.read();
        if !dataset.delete_record(collection, id) {
            warn!("No {} with id {}", collection.id_prefix(), id);
            return false;
        }
        self.engine.write(&dataset).await
    }
}
