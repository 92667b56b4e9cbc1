use serde::{Deserialize, Serialize};

/// A numeric target the card tracks. `avg_per_day` drives the completion
/// forecast; a zero or negative rate means no forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target: i64,
    pub avg_per_day: f64,
}

/// A boolean item persisted in the store as a 0/1 counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
}

/// Normalized card configuration. This is both the internal shape and the
/// shape emitted back out on `GET /api/config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub title: String,
    pub goals: Vec<Goal>,
    pub checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    pub id: String,
    pub name: String,
    pub target: i64,
    pub current: i64,
    pub remaining: i64,
    pub avg_per_day: f64,
    pub days_left: Option<i64>,
    pub projected_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistView {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

/// Everything the page needs to render one frame of the card.
#[derive(Debug, Clone, Serialize)]
pub struct CardSnapshot {
    pub title: String,
    pub loading: bool,
    pub busy: bool,
    pub error: Option<String>,
    pub goals: Vec<GoalView>,
    pub checklist: Vec<ChecklistView>,
}

#[derive(Debug, Deserialize)]
pub struct IncrementRequest {
    #[serde(default = "default_increment")]
    pub amount: i64,
}

fn default_increment() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub checked: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub labels: Vec<String>,
}
