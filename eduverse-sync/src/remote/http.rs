//! Realtime-database REST store.
//!
//! Speaks the Firebase Realtime Database REST dialect: a document at `path`
//! lives at `{base_url}/{path}.json`, `PUT` replaces it and `GET` reads it.
//! Watches are polling tasks that deliver the first value they see and then
//! every value that differs from the last one delivered.

use super::store::{DocumentCallback, StoreAdapter, WatchHandle};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// HTTP store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Database root, e.g. `https://my-app-default-rtdb.firebaseio.com`.
    pub base_url: String,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth_token: Option<String>,
    /// How often watches poll for changes (ms).
    pub poll_interval_ms: u64,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            auth_token: None,
            poll_interval_ms: 5_000,
            timeout_ms: 30_000,
        }
    }
}

/// Request target shared between the store and its polling tasks.
#[derive(Clone)]
struct Endpoint {
    client: Client,
    url: String,
    auth_token: Option<String>,
}

impl Endpoint {
    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, &self.url);
        match &self.auth_token {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }

    async fn fetch(&self) -> SyncResult<Option<Value>> {
        let response = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("GET {} failed: {e}", self.url)))?;

        let response = check_status(response).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("invalid response body: {e}")))?;

        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }
}

async fn check_status(response: reqwest::Response) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Http {
        status: status.as_u16(),
        body,
    })
}

/// A document store reached over the realtime-database REST API.
pub struct HttpDocumentStore {
    config: HttpStoreConfig,
    client: Client,
    watchers: Mutex<HashMap<String, Vec<(u64, JoinHandle<()>)>>>,
    next_watch_id: AtomicU64,
}

impl HttpDocumentStore {
    /// Creates a store for the given database.
    pub fn new(config: HttpStoreConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            watchers: Mutex::new(HashMap::new()),
            next_watch_id: AtomicU64::new(0),
        })
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    /// URL of the document at `path`.
    pub fn document_url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn endpoint(&self, path: &str) -> Endpoint {
        Endpoint {
            client: self.client.clone(),
            url: self.document_url(path),
            auth_token: self.config.auth_token.clone(),
        }
    }

    fn lock_watchers(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, JoinHandle<()>)>>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of live polling tasks on `path`.
    pub fn active_watch_count(&self, path: &str) -> usize {
        self.lock_watchers()
            .get(path)
            .map_or(0, |w| w.iter().filter(|(_, task)| !task.is_finished()).count())
    }
}

#[async_trait]
impl StoreAdapter for HttpDocumentStore {
    fn provider_name(&self) -> &'static str {
        "Realtime Database (REST)"
    }

    async fn put_document(&self, path: &str, value: &Value) -> SyncResult<()> {
        let endpoint = self.endpoint(path);
        debug!("PUT {}", endpoint.url);

        let response = endpoint
            .request(reqwest::Method::PUT)
            .json(value)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("PUT {} failed: {e}", endpoint.url)))?;
        check_status(response).await?;

        info!("Stored document {}", path);
        Ok(())
    }

    async fn get_document(&self, path: &str) -> SyncResult<Option<Value>> {
        self.endpoint(path).fetch().await
    }

    fn watch_document(&self, path: &str, on_change: DocumentCallback) -> SyncResult<WatchHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::Runtime(format!("watch needs a tokio runtime: {e}")))?;

        let endpoint = self.endpoint(path);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let id = self.next_watch_id.fetch_add(1, Ordering::SeqCst) + 1;

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<Option<Value>> = None;

            loop {
                ticker.tick().await;
                match endpoint.fetch().await {
                    Ok(value) => {
                        if last.as_ref() != Some(&value) {
                            on_change(value.clone());
                            last = Some(value);
                        }
                    }
                    Err(e) => warn!("Polling {} failed: {}", endpoint.url, e),
                }
            }
        });

        self.lock_watchers()
            .entry(path.to_string())
            .or_default()
            .push((id, task));
        debug!("Watching {} (watch {})", path, id);

        Ok(WatchHandle {
            path: path.to_string(),
            id,
        })
    }

    fn stop_watching(&self, path: &str) {
        if let Some(tasks) = self.lock_watchers().remove(path) {
            for (_, task) in tasks {
                task.abort();
            }
            debug!("Stopped watching {}", path);
        }
    }
}

impl Drop for HttpDocumentStore {
    fn drop(&mut self) {
        for (_, tasks) in self.lock_watchers().drain() {
            for (_, task) in tasks {
                task.abort();
            }
        }
    }
}
