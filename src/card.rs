use crate::config::{self, RawCardConfig};
use crate::models::{CardConfig, CardSnapshot, ChecklistItem, ChecklistView, Goal};
use crate::projection;
use crate::store::{StoreClient, StoreRequest, checklist_key};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Quiet period after the last increment before the accumulated delta is
/// written to the store.
pub const DEBOUNCE: Duration = Duration::from_millis(1000);

/// Unflushed optimistic increments for one goal. At most one store write per
/// goal is ever in flight; amounts queued meanwhile accumulate here. Entries
/// stay around in a zero-amount idle state once created.
#[derive(Default)]
struct PendingDelta {
    amount: i64,
    in_flight: bool,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct CardState {
    title: String,
    goals: Vec<Goal>,
    checklist: Vec<ChecklistItem>,
    counts: HashMap<String, i64>,
    checks: HashMap<String, bool>,
    pending: HashMap<String, PendingDelta>,
    loaded_signature: Option<String>,
    last_error: Option<String>,
    loading: bool,
    busy: bool,
}

/// The card engine: owns the locally served counter state and keeps it
/// reconciled with the store under optimistic writes. Cheap to clone; all
/// clones share one state.
#[derive(Clone)]
pub struct Card {
    store: Arc<dyn StoreClient>,
    state: Arc<Mutex<CardState>>,
}

enum FetchSlot {
    Count(String),
    Check(String),
}

impl Card {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(CardState::default())),
        }
    }

    /// Apply a configuration and reconcile local state against the store.
    /// Idempotent per configuration signature: re-applying an unchanged
    /// config does nothing, and the signature is recorded before the fetch
    /// starts so re-entrant triggers cannot start a second cycle.
    pub async fn configure(&self, raw: &RawCardConfig) {
        let normalized = config::normalize(raw);
        let signature = config::signature(&normalized);
        let (goal_ids, item_ids) = {
            let mut state = self.state.lock().await;
            if state.loaded_signature.as_deref() == Some(signature.as_str()) {
                return;
            }
            state.loaded_signature = Some(signature);
            state.title = normalized.title;
            state.goals = normalized.goals;
            state.checklist = normalized.checklist;
            state.loading = true;
            state.last_error = None;
            (
                state.goals.iter().map(|goal| goal.id.clone()).collect::<Vec<_>>(),
                state.checklist.iter().map(|item| item.id.clone()).collect::<Vec<_>>(),
            )
        };
        debug!(goals = goal_ids.len(), items = item_ids.len(), "reloading card from store");
        self.reload(goal_ids, item_ids).await;
    }

    /// Fetch authoritative values for every goal and checklist item
    /// concurrently. Successes land as they complete; the first failure
    /// records the error and abandons the rest of the batch.
    async fn reload(&self, goal_ids: Vec<String>, item_ids: Vec<String>) {
        let mut fetches = JoinSet::new();
        for id in goal_ids {
            let store = Arc::clone(&self.store);
            fetches.spawn(async move {
                let result = store.call(StoreRequest::Get { key: id.clone() }).await;
                (FetchSlot::Count(id), result)
            });
        }
        for id in item_ids {
            let store = Arc::clone(&self.store);
            let key = checklist_key(&id);
            fetches.spawn(async move {
                let result = store.call(StoreRequest::Get { key }).await;
                (FetchSlot::Check(id), result)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            let Ok((slot, result)) = joined else { continue };
            match result {
                Ok(value) => {
                    let mut state = self.state.lock().await;
                    match slot {
                        FetchSlot::Count(id) => {
                            state.counts.insert(id, value.value.unwrap_or(0));
                        }
                        FetchSlot::Check(id) => {
                            state.checks.insert(id, value.value.unwrap_or(0) > 0);
                        }
                    }
                }
                Err(err) => {
                    warn!("card reload aborted: {err}");
                    let mut state = self.state.lock().await;
                    state.last_error = Some(err.to_string());
                    break;
                }
            }
        }

        let mut state = self.state.lock().await;
        state.loading = false;
    }

    /// Record an increment: the local count moves immediately, the store
    /// write is debounced so rapid repeats coalesce into one `Set`.
    pub async fn queue_delta(&self, goal_id: &str, delta: i64) {
        if delta == 0 || goal_id.trim().is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        let count = state.counts.entry(goal_id.to_string()).or_insert(0);
        *count = count.saturating_add(delta);

        let pending = state.pending.entry(goal_id.to_string()).or_default();
        pending.amount = pending.amount.saturating_add(delta);
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        let card = self.clone();
        let id = goal_id.to_string();
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;
            card.flush(&id).await;
        }));
    }

    /// Write the pending amount for one goal to the store. The amount is
    /// captured and zeroed before the call, so increments arriving mid-write
    /// are neither lost nor double-counted; they are sent by the next loop
    /// iteration once this write settles. A failed write keeps the optimistic
    /// local value and records the error; the lost amount is not re-queued.
    pub async fn flush(&self, goal_id: &str) {
        loop {
            let amount = {
                let mut state = self.state.lock().await;
                let Some(pending) = state.pending.get_mut(goal_id) else {
                    return;
                };
                if pending.in_flight || pending.amount == 0 {
                    return;
                }
                pending.in_flight = true;
                std::mem::take(&mut pending.amount)
            };

            debug!(goal = goal_id, amount, "flushing pending delta");
            let result = self
                .store
                .call(StoreRequest::Set { key: goal_id.to_string(), delta: amount })
                .await;

            let mut state = self.state.lock().await;
            match result {
                Ok(value) => {
                    state.counts.insert(goal_id.to_string(), value.value.unwrap_or(0));
                    state.last_error = None;
                }
                Err(err) => {
                    warn!("flush for '{goal_id}' failed: {err}");
                    state.last_error = Some(err.to_string());
                }
            }
            let Some(pending) = state.pending.get_mut(goal_id) else {
                return;
            };
            pending.in_flight = false;
            if pending.amount == 0 {
                return;
            }
        }
    }

    /// Toggle a checklist item. Unlike goal increments this is a single
    /// immediate write; the busy flag is what keeps the page from issuing a
    /// second toggle while one is pending.
    pub async fn set_checked(&self, item_id: &str, checked: bool) {
        let delta = {
            let mut state = self.state.lock().await;
            let current = state.checks.get(item_id).copied().unwrap_or(false);
            let delta = i64::from(checked) - i64::from(current);
            if delta == 0 {
                return;
            }
            state.busy = true;
            state.checks.insert(item_id.to_string(), checked);
            delta
        };

        let result = self
            .store
            .call(StoreRequest::Set { key: checklist_key(item_id), delta })
            .await;

        let mut state = self.state.lock().await;
        match result {
            Ok(value) => {
                state.checks.insert(item_id.to_string(), value.value.unwrap_or(0) > 0);
                state.last_error = None;
            }
            Err(err) => {
                warn!("toggle for '{item_id}' failed: {err}");
                state.last_error = Some(err.to_string());
            }
        }
        state.busy = false;
    }

    pub async fn snapshot(&self) -> CardSnapshot {
        let state = self.state.lock().await;
        let goals = state
            .goals
            .iter()
            .map(|goal| {
                projection::project(goal, state.counts.get(&goal.id).copied().unwrap_or(0))
            })
            .collect();
        let checklist = state
            .checklist
            .iter()
            .map(|item| ChecklistView {
                id: item.id.clone(),
                label: item.label.clone(),
                checked: state.checks.get(&item.id).copied().unwrap_or(false),
            })
            .collect();
        CardSnapshot {
            title: state.title.clone(),
            loading: state.loading,
            busy: state.busy,
            error: state.last_error.clone(),
            goals,
            checklist,
        }
    }

    pub async fn emitted_config(&self) -> CardConfig {
        let state = self.state.lock().await;
        CardConfig {
            title: state.title.clone(),
            goals: state.goals.clone(),
            checklist: state.checklist.clone(),
        }
    }

    pub async fn has_goal(&self, goal_id: &str) -> bool {
        let state = self.state.lock().await;
        state.goals.iter().any(|goal| goal.id == goal_id)
    }

    pub async fn has_item(&self, item_id: &str) -> bool {
        let state = self.state.lock().await;
        state.checklist.iter().any(|item| item.id == item_id)
    }
}
