//! Configuration and rendering for the `eduverse` command-line client.

use anyhow::{Context, Result, bail};
use eduverse_sync::{HttpStoreConfig, ProbeConfig, SyncConfig};
use eduverse_types::{Collection, Dataset, Record, SyncStatus, format_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Default directory for the durable cache.
pub const DEFAULT_CACHE_DIR: &str = ".eduverse";

/// Contents of the optional `--config` file. Every field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding the durable cache.
    pub cache_dir: Option<PathBuf>,
    /// Remote realtime database. Without one the client works offline.
    pub remote: Option<HttpStoreConfig>,
    /// Reachability probe. Derived from the remote URL when absent.
    pub probe: Option<ProbeConfig>,
    pub sync: SyncConfig,
}

impl CliConfig {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Points the remote store at `url`, keeping any other remote settings.
    pub fn set_remote_url(&mut self, url: impl Into<String>) {
        let remote = self.remote.get_or_insert_with(HttpStoreConfig::default);
        remote.base_url = url.into();
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    /// Probe settings: explicit ones, else a shallow read of the remote root.
    pub fn probe_config(&self) -> Option<ProbeConfig> {
        if let Some(probe) = &self.probe {
            return Some(probe.clone());
        }
        let remote = self.remote.as_ref()?;
        Some(ProbeConfig {
            url: format!("{}/.json?shallow=true", remote.base_url.trim_end_matches('/')),
            ..ProbeConfig::default()
        })
    }
}

/// Parses a JSON object given on the command line into record fields.
pub fn parse_fields(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("Fields must be valid JSON")?;
    match value {
        Value::Object(fields) => Ok(fields),
        other => bail!("Fields must be a JSON object, got {other}"),
    }
}

/// One-line status: connectivity and last sync time.
pub fn render_status(status: &SyncStatus) -> String {
    let last = status
        .last_synced
        .map_or_else(|| "never".to_string(), format_timestamp);
    format!(
        "{}, last synced {}",
        if status.online { "online" } else { "offline" },
        last
    )
}

/// Per-collection record counts followed by the status line.
pub fn render_summary(dataset: &Dataset, status: &SyncStatus) -> String {
    let mut out = String::new();
    for collection in Collection::ALL {
        let _ = writeln!(out, "{:<10}{:>6}", collection.key(), dataset.records(collection).len());
    }
    let _ = write!(out, "status    {}", render_status(status));
    out
}

/// A record as a single JSON line.
pub fn render_record(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
}
