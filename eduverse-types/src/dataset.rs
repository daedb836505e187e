//! The full content snapshot and its normalization rules.
//!
//! A `Dataset` always carries all six collections. Anything read from the
//! durable cache or received from the remote store goes through
//! [`Dataset::normalize`], which never fails: missing collections, `null`s
//! and non-sequence values all become empty sequences. Record contents are
//! never interpreted, so sequences come through entry for entry.

use crate::{Collection, Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A single loosely typed record.
///
/// Records are normally JSON objects, but entries of any other shape found
/// in a collection are carried through untouched so they survive a round
/// trip through the cache and the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Default for Record {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(Value::Object(fields))),
            other => Err(Error::InvalidRecord(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    /// Wraps a collection entry of any shape without validation.
    #[must_use]
    pub fn from_raw(value: Value) -> Self {
        Self(value)
    }

    /// Whether the record is a JSON object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Returns the record's `id` field, if it is a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Sets a field, returning the previous value. Records that are not
    /// objects are left unchanged.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.as_object_mut()?.insert(field.into(), value)
    }

    /// Shallow merge: every field in `updates` replaces the field of the same name.
    /// Records that are not objects are left unchanged.
    pub fn merge(&mut self, updates: &Map<String, Value>) {
        if let Some(fields) = self.0.as_object_mut() {
            for (field, value) in updates {
                fields.insert(field.clone(), value.clone());
            }
        }
    }

    /// Borrows the fields of an object record.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Borrows the raw JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the record, returning the raw JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(Value::Object(fields))
    }
}

/// The full in-memory snapshot of all content collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub batches: Vec<Record>,
    pub subjects: Vec<Record>,
    pub lectures: Vec<Record>,
    pub notes: Vec<Record>,
    pub dpps: Vec<Record>,
    pub students: Vec<Record>,
}

impl Dataset {
    /// Creates a dataset with every collection empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fully keyed dataset from an arbitrary JSON payload.
    ///
    /// Collections that are missing, `null` or not sequences come back empty.
    /// Sequences are kept entry for entry, whatever the entries hold.
    /// Index-keyed objects (how the realtime database returns sparse arrays)
    /// are read in index order. Idempotent over its own serialized output.
    #[must_use]
    pub fn normalize(value: &Value) -> Self {
        let mut dataset = Self::default();
        let Some(map) = value.as_object() else {
            return dataset;
        };
        for collection in Collection::ALL {
            if let Some(raw) = map.get(collection.key()) {
                *dataset.records_mut(collection) = records_from(raw);
            }
        }
        dataset
    }

    /// Parses a serialized dataset. Only malformed JSON is an error;
    /// structural gaps are normalized away.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::normalize(&value))
    }

    /// Serializes the dataset to a JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the dataset to a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Records of one collection.
    #[must_use]
    pub fn records(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Batches => &self.batches,
            Collection::Subjects => &self.subjects,
            Collection::Lectures => &self.lectures,
            Collection::Notes => &self.notes,
            Collection::Dpps => &self.dpps,
            Collection::Students => &self.students,
        }
    }

    /// Mutable records of one collection.
    pub fn records_mut(&mut self, collection: Collection) -> &mut Vec<Record> {
        match collection {
            Collection::Batches => &mut self.batches,
            Collection::Subjects => &mut self.subjects,
            Collection::Lectures => &mut self.lectures,
            Collection::Notes => &mut self.notes,
            Collection::Dpps => &mut self.dpps,
            Collection::Students => &mut self.students,
        }
    }

    /// Total number of records across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        Collection::ALL.iter().map(|c| self.records(*c).len()).sum()
    }

    /// Returns true when every collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn find_record(&self, collection: Collection, id: &str) -> Option<&Record> {
        self.records(collection).iter().find(|r| r.id() == Some(id))
    }

    /// Appends a record, assigning a generated id unless `fields` carries one.
    /// Returns the stored record.
    pub fn add_record(&mut self, collection: Collection, fields: Map<String, Value>) -> Record {
        let mut record = Record::new();
        record.set("id", Value::String(collection.new_record_id()));
        record.merge(&fields);
        self.records_mut(collection).push(record.clone());
        record
    }

    /// Shallow-merges `updates` into every record with the given id.
    /// Returns whether any record matched.
    pub fn update_record(
        &mut self,
        collection: Collection,
        id: &str,
        updates: &Map<String, Value>,
    ) -> bool {
        let mut matched = false;
        for record in self.records_mut(collection) {
            if record.id() == Some(id) {
                record.merge(updates);
                matched = true;
            }
        }
        matched
    }

    /// Removes every record with the given id. Returns whether any was removed.
    pub fn delete_record(&mut self, collection: Collection, id: &str) -> bool {
        let records = self.records_mut(collection);
        let before = records.len();
        records.retain(|r| r.id() != Some(id));
        records.len() != before
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::normalize(&value))
    }
}

fn records_from(raw: &Value) -> Vec<Record> {
    match raw {
        Value::Array(items) => items.iter().cloned().map(Record).collect(),
        Value::Object(entries) => {
            let mut indexed: Vec<(&String, &Value)> = entries.iter().collect();
            indexed.sort_by(|(a, _), (b, _)| index_of(a).cmp(&index_of(b)).then_with(|| a.cmp(b)));
            indexed.into_iter().map(|(_, v)| Record(v.clone())).collect()
        }
        _ => Vec::new(),
    }
}

fn index_of(key: &str) -> u64 {
    key.parse().unwrap_or(u64::MAX)
}
