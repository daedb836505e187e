//! Connectivity and last-sync status broadcast to subscribers.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Connectivity flag plus the time of the last successful sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Mirrors the host connectivity signal.
    pub online: bool,
    /// Last time the remote store confirmed a write or delivered a change.
    pub last_synced: Option<DateTime<Utc>>,
}

impl SyncStatus {
    /// Creates a status that has never synced.
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self {
            online,
            last_synced: None,
        }
    }

    /// Records a successful sync at `at`.
    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.last_synced = Some(at);
    }

    /// Returns true once any sync has succeeded.
    #[must_use]
    pub const fn has_synced(&self) -> bool {
        self.last_synced.is_some()
    }
}

/// Formats a timestamp the way it is persisted (RFC 3339, millisecond precision, `Z`).
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a persisted timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp(format!("{raw}: {e}")))
}
