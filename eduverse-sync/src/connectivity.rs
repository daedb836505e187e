//! Host connectivity signal.
//!
//! [`Connectivity`] is the online/offline reading the engine mirrors. Hosts
//! that know their network state call [`Connectivity::set_online`] directly;
//! everyone else can run [`spawn_probe`] to derive it from reachability of
//! an HTTP endpoint.

use crate::error::{SyncError, SyncResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Online/offline signal with change notification.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Creates a signal with the given initial reading.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Current reading.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Updates the reading. Receivers only wake on an actual transition.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }

    /// Receiver that wakes on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Reachability probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// URL to probe. Any HTTP response counts as reachable.
    pub url: String,
    /// Delay between probes (ms).
    pub interval_ms: u64,
    /// Per-probe timeout (ms).
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000/.json?shallow=true".to_string(),
            interval_ms: 10_000,
            timeout_ms: 5_000,
        }
    }
}

/// Returns true if `url` answered at all, whatever the status code.
pub async fn probe_once(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            debug!("Probe {} answered {}", url, response.status());
            true
        }
        Err(e) => {
            debug!("Probe {} failed: {}", url, e);
            false
        }
    }
}

/// Spawns a task that probes `config.url` forever and feeds the result
/// into `connectivity`. Abort the returned handle to stop probing.
pub fn spawn_probe(connectivity: Connectivity, config: ProbeConfig) -> SyncResult<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| SyncError::Runtime(format!("probe needs a tokio runtime: {e}")))?;
    let client = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;

    Ok(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = probe_once(&client, &config.url).await;
            connectivity.set_online(reachable);
        }
    }))
}
