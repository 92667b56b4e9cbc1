use crate::config::{RawCardConfig, persist_config};
use crate::errors::AppError;
use crate::ids::{make_unique_id, slugify};
use crate::models::{
    AddItemsRequest, CardConfig, CardSnapshot, CheckRequest, ChecklistItem, IncrementRequest,
};
use crate::state::AppState;
use crate::ui::render_card;
use axum::{
    Json,
    extract::{Path, State},
    response::Html,
};
use std::collections::HashSet;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let snapshot = state.card.snapshot().await;
    Html(render_card(&snapshot))
}

pub async fn get_card(State(state): State<AppState>) -> Json<CardSnapshot> {
    Json(state.card.snapshot().await)
}

pub async fn increment(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
    Json(payload): Json<IncrementRequest>,
) -> Result<Json<CardSnapshot>, AppError> {
    if payload.amount == 0 {
        return Err(AppError::bad_request("amount must be nonzero"));
    }
    if !state.card.has_goal(&goal_id).await {
        return Err(AppError::bad_request(format!("unknown goal '{goal_id}'")));
    }

    state.card.queue_delta(&goal_id, payload.amount).await;
    Ok(Json(state.card.snapshot().await))
}

pub async fn set_check(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(payload): Json<CheckRequest>,
) -> Result<Json<CardSnapshot>, AppError> {
    if !state.card.has_item(&item_id).await {
        return Err(AppError::bad_request(format!(
            "unknown checklist item '{item_id}'"
        )));
    }

    state.card.set_checked(&item_id, payload.checked).await;
    Ok(Json(state.card.snapshot().await))
}

pub async fn get_config(State(state): State<AppState>) -> Json<CardConfig> {
    Json(state.card.emitted_config().await)
}

pub async fn update_config(
    State(state): State<AppState>,
    Json(raw): Json<RawCardConfig>,
) -> Result<Json<CardSnapshot>, AppError> {
    state.card.configure(&raw).await;
    let emitted = state.card.emitted_config().await;
    persist_config(&state.config_path, &emitted).await?;
    Ok(Json(state.card.snapshot().await))
}

/// Bulk-append checklist labels (the editor's import path). Labels matching
/// an existing item case-insensitively are skipped; the rest get fresh ids.
pub async fn add_checklist_items(
    State(state): State<AppState>,
    Json(payload): Json<AddItemsRequest>,
) -> Result<Json<CardSnapshot>, AppError> {
    let mut config = state.card.emitted_config().await;
    let mut used: HashSet<String> = config
        .checklist
        .iter()
        .map(|item| item.id.clone())
        .collect();

    for label in &payload.labels {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        if config
            .checklist
            .iter()
            .any(|item| item.label.eq_ignore_ascii_case(label))
        {
            continue;
        }
        let id = make_unique_id(&slugify(label), &used);
        used.insert(id.clone());
        config.checklist.push(ChecklistItem {
            id,
            label: label.to_string(),
        });
    }

    state.card.configure(&RawCardConfig::from_config(&config)).await;
    let emitted = state.card.emitted_config().await;
    persist_config(&state.config_path, &emitted).await?;
    Ok(Json(state.card.snapshot().await))
}
