use eduverse_cli::{CliConfig, DEFAULT_CACHE_DIR, parse_fields, render_record, render_status, render_summary};
use eduverse_types::{Dataset, Record, SyncStatus, parse_timestamp};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Config ───────────────────────────────────────────────────────

#[test]
fn default_config_is_local_only() {
    let config = CliConfig::default();
    assert!(config.remote.is_none());
    assert!(config.probe_config().is_none());
    assert_eq!(config.cache_dir(), PathBuf::from(DEFAULT_CACHE_DIR));
    assert_eq!(config.sync.document_path, "data");
}

#[test]
fn load_partial_config() {
    let file = write_config(
        r#"{
            "cache_dir": "/tmp/eduverse-cache",
            "remote": { "base_url": "https://demo.firebaseio.com", "auth_token": "s3cret" },
            "sync": { "document_path": "portal" }
        }"#,
    );

    let config = CliConfig::load(file.path()).unwrap();
    assert_eq!(config.cache_dir(), PathBuf::from("/tmp/eduverse-cache"));
    let remote = config.remote.as_ref().unwrap();
    assert_eq!(remote.base_url, "https://demo.firebaseio.com");
    assert_eq!(remote.auth_token.as_deref(), Some("s3cret"));
    assert_eq!(remote.poll_interval_ms, 5_000);
    assert_eq!(config.sync.document_path, "portal");
    assert_eq!(config.sync.data_key, "eduverse_data");
}

#[test]
fn load_rejects_invalid_json() {
    let file = write_config("{ nope");
    let err = CliConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid config file"));
}

#[test]
fn load_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CliConfig::load(&dir.path().join("absent.json")).is_err());
}

#[test]
fn remote_flag_overrides_url_only() {
    let mut config = CliConfig::default();
    config.set_remote_url("https://a.example.com");
    config.remote.as_mut().unwrap().auth_token = Some("token".to_string());

    config.set_remote_url("https://b.example.com");

    let remote = config.remote.unwrap();
    assert_eq!(remote.base_url, "https://b.example.com");
    assert_eq!(remote.auth_token.as_deref(), Some("token"));
}

#[test]
fn probe_derived_from_remote() {
    let mut config = CliConfig::default();
    config.set_remote_url("https://demo.firebaseio.com/");

    let probe = config.probe_config().unwrap();
    assert_eq!(probe.url, "https://demo.firebaseio.com/.json?shallow=true");
}

#[test]
fn explicit_probe_wins() {
    let file = write_config(r#"{ "probe": { "url": "http://10.0.0.1/health", "interval_ms": 500 } }"#);
    let config = CliConfig::load(file.path()).unwrap();

    let probe = config.probe_config().unwrap();
    assert_eq!(probe.url, "http://10.0.0.1/health");
    assert_eq!(probe.interval_ms, 500);
    assert_eq!(probe.timeout_ms, 5_000);
}

// ── Fields ───────────────────────────────────────────────────────

#[test]
fn parse_fields_accepts_objects() {
    let fields = parse_fields(r#"{"name":"JEE","year":2025}"#).unwrap();
    assert_eq!(fields.get("name"), Some(&json!("JEE")));
    assert_eq!(fields.get("year"), Some(&json!(2025)));
}

#[test]
fn parse_fields_rejects_non_objects() {
    assert!(parse_fields("[1,2]").is_err());
    assert!(parse_fields("\"name\"").is_err());
    assert!(parse_fields("name=JEE").is_err());
}

// ── Rendering ────────────────────────────────────────────────────

#[test]
fn status_line() {
    assert_eq!(render_status(&SyncStatus::new(false)), "offline, last synced never");

    let mut status = SyncStatus::new(true);
    status.mark_synced(parse_timestamp("2024-05-01T10:00:00.000Z").unwrap());
    assert_eq!(render_status(&status), "online, last synced 2024-05-01T10:00:00.000Z");
}

#[test]
fn summary_lists_every_collection() {
    let dataset = Dataset::normalize(&json!({ "batches": [{ "id": "b1" }, { "id": "b2" }] }));
    let summary = render_summary(&dataset, &SyncStatus::new(false));

    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "batches        2");
    assert_eq!(lines[5], "students       0");
    assert_eq!(lines[6], "status    offline, last synced never");
}

#[test]
fn record_is_one_json_line() {
    let record = Record::from_value(json!({ "id": "n1", "title": "Vectors" })).unwrap();
    let line = render_record(&record);
    assert!(!line.contains('\n'));
    assert_eq!(serde_json::from_str::<serde_json::Value>(&line).unwrap()["title"], "Vectors");
}
