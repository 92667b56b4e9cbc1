use crate::errors::AppError;
use crate::ids::normalize_entries;
use crate::models::{CardConfig, ChecklistItem, Goal};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    env,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::error;

pub const DEFAULT_TITLE: &str = "Goals";

const GOAL_LABEL_FIELDS: &[&str] = &["name", "title", "id"];
const ITEM_LABEL_FIELDS: &[&str] = &["label", "name", "title", "id"];
const RATE_FIELDS: &[&str] = &["avg_per_day", "avgPerDay", "per_day", "perDay"];

/// Configuration as the host hands it over: loosely typed lists whose entries
/// may use any of several field spellings. `normalize` turns this into a
/// `CardConfig`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCardConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub goals: Vec<Value>,
    #[serde(default)]
    pub checklist: Vec<Value>,
}

impl RawCardConfig {
    /// Re-wrap an already normalized configuration, used when the service
    /// itself edits the config (normalization is idempotent over this).
    pub fn from_config(config: &CardConfig) -> Self {
        Self {
            title: Some(config.title.clone()),
            goals: config
                .goals
                .iter()
                .filter_map(|goal| serde_json::to_value(goal).ok())
                .collect(),
            checklist: config
                .checklist
                .iter()
                .filter_map(|item| serde_json::to_value(item).ok())
                .collect(),
        }
    }
}

pub fn normalize(raw: &RawCardConfig) -> CardConfig {
    let goals = normalize_entries(&raw.goals, GOAL_LABEL_FIELDS, |obj, id, label| Goal {
        id,
        name: label,
        target: number_field(obj, &["target"])
            .map(|value| value.round().max(0.0) as i64)
            .unwrap_or(0),
        avg_per_day: number_field(obj, RATE_FIELDS).unwrap_or(0.0),
    });
    let checklist = normalize_entries(&raw.checklist, ITEM_LABEL_FIELDS, |_, id, label| {
        ChecklistItem { id, label }
    });
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    CardConfig {
        title,
        goals,
        checklist,
    }
}

fn number_field(obj: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    for field in fields {
        if let Some(value) = obj.get(*field).and_then(Value::as_f64) {
            if value.is_finite() {
                return Some(value);
            }
        }
    }
    None
}

/// Order-sensitive fingerprint of a normalized configuration. Two configs
/// with the same signature render and persist identically, so a matching
/// signature means reconciliation can be skipped.
pub fn signature(config: &CardConfig) -> String {
    serde_json::to_string(config).unwrap_or_default()
}

pub fn resolve_config_path() -> PathBuf {
    env::var("CARD_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/card.json"))
}

pub fn resolve_counters_path() -> PathBuf {
    env::var("CARD_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/counters.json"))
}

pub fn store_url() -> Option<String> {
    env::var("STORE_URL")
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

pub async fn load_config(path: &Path) -> RawCardConfig {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(err) => {
                error!("failed to parse card config: {err}");
                RawCardConfig::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => RawCardConfig::default(),
        Err(err) => {
            error!("failed to read card config: {err}");
            RawCardConfig::default()
        }
    }
}

pub async fn persist_config(path: &Path, config: &CardConfig) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(config).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(AppError::internal)?;
    Ok(())
}
