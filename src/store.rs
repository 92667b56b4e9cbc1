use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::error;

/// Namespace token identifying this card's slice of the key/value backend.
pub const STORE_DOMAIN: &str = "goal_card";

/// Checklist counters share the flat namespace with goal counters; the prefix
/// keeps the two apart.
pub const CHECKLIST_PREFIX: &str = "checklist_";

pub fn checklist_key(item_id: &str) -> String {
    format!("{CHECKLIST_PREFIX}{}", item_id.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRequest {
    Get { key: String },
    Set { key: String, delta: i64 },
}

/// Counter value as the store reports it. `None` means the key has never been
/// written; callers clamp that to 0, the store does not.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoreValue {
    pub value: Option<i64>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store returned status {0}")]
    Status(u16),
    #[error("store response malformed: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The one seam between the card and whatever holds its counters. `Get`
/// fetches a counter, `Set` applies a signed delta atomically and returns the
/// new authoritative value. Implementations never retry.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn call(&self, request: StoreRequest) -> Result<StoreValue, StoreError>;
}

/// Remote backend speaking the `<domain>/get` / `<domain>/set` protocol as
/// JSON POSTs against a base URL.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StoreClient for HttpStore {
    async fn call(&self, request: StoreRequest) -> Result<StoreValue, StoreError> {
        let (op, body) = match &request {
            StoreRequest::Get { key } => ("get", json!({ "key": key })),
            StoreRequest::Set { key, delta } => ("set", json!({ "key": key, "delta": delta })),
        };
        let url = format!("{}/{STORE_DOMAIN}/{op}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| StoreError::Protocol(err.to_string()))
    }
}

/// Local backend keeping counters in a JSON file, so the binary runs without
/// any remote store. A missing file is an empty store; an unreadable one is
/// logged and treated as empty.
pub struct FileStore {
    path: PathBuf,
    counters: Mutex<BTreeMap<String, i64>>,
}

impl FileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counters = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(counters) => counters,
                Err(err) => {
                    error!("failed to parse counters file: {err}");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                error!("failed to read counters file: {err}");
                BTreeMap::new()
            }
        };
        Self {
            path,
            counters: Mutex::new(counters),
        }
    }
}

#[async_trait]
impl StoreClient for FileStore {
    async fn call(&self, request: StoreRequest) -> Result<StoreValue, StoreError> {
        let mut counters = self.counters.lock().await;
        match request {
            StoreRequest::Get { key } => Ok(StoreValue {
                value: counters.get(key.trim()).copied(),
            }),
            StoreRequest::Set { key, delta } => {
                let entry = counters.entry(key.trim().to_string()).or_insert(0);
                *entry = entry.saturating_add(delta);
                let value = *entry;
                let payload = serde_json::to_vec_pretty(&*counters)?;
                fs::write(&self.path, payload).await?;
                Ok(StoreValue { value: Some(value) })
            }
        }
    }
}
