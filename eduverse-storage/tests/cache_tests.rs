use eduverse_storage::{DurableCache, FileCache, MemoryCache, SqliteCache, StorageError};
use tempfile::TempDir;

fn exercise_contract(cache: &dyn DurableCache) {
    assert_eq!(cache.get("eduverse_data").unwrap(), None);

    cache.set("eduverse_data", r#"{"batches":[]}"#).unwrap();
    assert_eq!(
        cache.get("eduverse_data").unwrap().as_deref(),
        Some(r#"{"batches":[]}"#)
    );

    cache.set("eduverse_data", "second").unwrap();
    assert_eq!(cache.get("eduverse_data").unwrap().as_deref(), Some("second"));

    cache.set("eduverse_last_sync", "2026-01-01T00:00:00.000Z").unwrap();
    assert_eq!(cache.get("eduverse_data").unwrap().as_deref(), Some("second"));

    cache.remove("eduverse_data").unwrap();
    assert_eq!(cache.get("eduverse_data").unwrap(), None);
    assert!(cache.get("eduverse_last_sync").unwrap().is_some());

    // Removing twice is fine.
    cache.remove("eduverse_data").unwrap();
}

// ── MemoryCache ──────────────────────────────────────────────────

#[test]
fn memory_cache_contract() {
    let cache = MemoryCache::new();
    exercise_contract(&cache);
}

#[test]
fn memory_cache_len() {
    let cache = MemoryCache::new();
    assert!(cache.is_empty());
    cache.set("a", "1").unwrap();
    cache.set("b", "2").unwrap();
    cache.set("a", "3").unwrap();
    assert_eq!(cache.len(), 2);
}

// ── FileCache ────────────────────────────────────────────────────

#[test]
fn file_cache_contract() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::open(dir.path()).unwrap();
    exercise_contract(&cache);
}

#[test]
fn file_cache_creates_missing_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("cache");
    let cache = FileCache::open(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(cache.root(), root.as_path());
}

#[test]
fn file_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    FileCache::open(dir.path())
        .unwrap()
        .set("eduverse_data", "persisted")
        .unwrap();

    let reopened = FileCache::open(dir.path()).unwrap();
    assert_eq!(
        reopened.get("eduverse_data").unwrap().as_deref(),
        Some("persisted")
    );
}

#[test]
fn file_cache_leaves_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::open(dir.path()).unwrap();
    cache.set("k", "v").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["k.json".to_string()]);
}

#[test]
fn file_cache_cleans_up_after_failed_write() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::open(dir.path()).unwrap();
    // A directory where the value file belongs makes the final rename fail.
    std::fs::create_dir(dir.path().join("k.json")).unwrap();

    let err = cache.set("k", "v").unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["k.json".to_string()]);
}

#[test]
fn file_cache_rejects_path_like_keys() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::open(dir.path()).unwrap();

    for key in ["", "../escape", "a/b", ".hidden", "sp ace"] {
        let err = cache.set(key, "x").unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)), "key {key:?}");
    }
}

// ── SqliteCache ──────────────────────────────────────────────────

#[test]
fn sqlite_cache_contract() {
    let cache = SqliteCache::open_in_memory().unwrap();
    exercise_contract(&cache);
}

#[test]
fn sqlite_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.db");

    SqliteCache::open(&path)
        .unwrap()
        .set("eduverse_data", "persisted")
        .unwrap();

    let reopened = SqliteCache::open(&path).unwrap();
    assert_eq!(
        reopened.get("eduverse_data").unwrap().as_deref(),
        Some("persisted")
    );
}

#[test]
fn sqlite_cache_tracks_updated_at() {
    let cache = SqliteCache::open_in_memory().unwrap();
    assert_eq!(cache.updated_at("k").unwrap(), None);
    cache.set("k", "v").unwrap();
    let updated = cache.updated_at("k").unwrap().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&updated).is_ok());
}

#[test]
fn sqlite_cache_accepts_any_key() {
    let cache = SqliteCache::open_in_memory().unwrap();
    cache.set("../not/a/path", "ok").unwrap();
    assert_eq!(cache.get("../not/a/path").unwrap().as_deref(), Some("ok"));
}
