use eduverse_sync::{DocumentCallback, MemoryDocumentStore, StoreAdapter, SyncError};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn capture() -> (Arc<Mutex<Vec<Option<Value>>>>, DocumentCallback) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: DocumentCallback = Arc::new(move |value| sink.lock().unwrap().push(value));
    (seen, callback)
}

#[tokio::test]
async fn put_stores_document() {
    let store = MemoryDocumentStore::new();
    store.put_document("data", &json!({ "batches": [] })).await.unwrap();

    assert_eq!(store.document("data"), Some(json!({ "batches": [] })));
    assert_eq!(store.document("other"), None);
    assert_eq!(store.put_count(), 1);
}

#[tokio::test]
async fn put_fires_watchers_of_that_path_only() {
    let store = MemoryDocumentStore::new();
    let (data_seen, data_cb) = capture();
    let (other_seen, other_cb) = capture();
    store.watch_document("data", data_cb).unwrap();
    store.watch_document("other", other_cb).unwrap();

    store.put_document("data", &json!(1)).await.unwrap();

    assert_eq!(*data_seen.lock().unwrap(), vec![Some(json!(1))]);
    assert!(other_seen.lock().unwrap().is_empty());
}

#[test]
fn watch_does_not_fire_on_setup() {
    let store = MemoryDocumentStore::new();
    store.write_external("data", json!(1));
    let (seen, callback) = capture();

    let handle = store.watch_document("data", callback).unwrap();

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(handle.path, "data");
    assert_eq!(store.active_watch_count("data"), 1);
    assert_eq!(store.watch_calls(), 1);
}

#[test]
fn watch_ids_increase() {
    let store = MemoryDocumentStore::new();
    let (_, a) = capture();
    let (_, b) = capture();
    let first = store.watch_document("data", a).unwrap();
    let second = store.watch_document("data", b).unwrap();
    assert!(second.id > first.id);
    assert_eq!(store.active_watch_count("data"), 2);
}

#[test]
fn stop_watching_removes_every_watch_on_path() {
    let store = MemoryDocumentStore::new();
    let (seen, callback) = capture();
    store.watch_document("data", callback.clone()).unwrap();
    store.watch_document("data", callback).unwrap();

    store.stop_watching("data");
    store.stop_watching("data");
    store.write_external("data", json!(2));

    assert_eq!(store.active_watch_count("data"), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn external_write_is_not_counted() {
    let store = MemoryDocumentStore::new();
    store.set_fail_puts(true);
    store.write_external("data", json!(3));
    assert_eq!(store.document("data"), Some(json!(3)));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn injected_put_failure() {
    let store = MemoryDocumentStore::new();
    store.set_fail_puts(true);

    let err = store.put_document("data", &json!(1)).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
    assert_eq!(store.document("data"), None);

    store.set_fail_puts(false);
    store.put_document("data", &json!(1)).await.unwrap();
    assert_eq!(store.put_count(), 1);
}

#[test]
fn injected_watch_failure() {
    let store = MemoryDocumentStore::new();
    store.set_fail_watches(true);
    let (_, callback) = capture();

    let err = store.watch_document("data", callback).unwrap_err();
    assert!(matches!(err, SyncError::Watch(_)));
    assert_eq!(store.watch_calls(), 0);
    assert_eq!(store.active_watch_count("data"), 0);
}

#[test]
fn callback_may_stop_its_own_watch() {
    let store = Arc::new(MemoryDocumentStore::new());
    let inner = store.clone();
    let callback: DocumentCallback = Arc::new(move |_| inner.stop_watching("data"));
    store.watch_document("data", callback).unwrap();

    store.write_external("data", json!(1));
    assert_eq!(store.active_watch_count("data"), 0);
}

#[tokio::test]
async fn get_reads_current_document() {
    let store = MemoryDocumentStore::new();
    assert_eq!(store.get_document("data").await.unwrap(), None);

    store.write_external("data", json!({ "notes": [] }));
    assert_eq!(store.get_document("data").await.unwrap(), Some(json!({ "notes": [] })));
}

#[tokio::test]
async fn injected_get_failure() {
    let store = MemoryDocumentStore::new();
    store.set_fail_gets(true);
    let err = store.get_document("data").await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
}

#[test]
fn provider_name() {
    assert_eq!(MemoryDocumentStore::new().provider_name(), "Memory");
}
