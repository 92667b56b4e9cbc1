use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/card", get(handlers::get_card))
        .route("/api/goal/:goal_id/increment", post(handlers::increment))
        .route("/api/check/:item_id", post(handlers::set_check))
        .route(
            "/api/config",
            get(handlers::get_config).put(handlers::update_config),
        )
        .route("/api/checklist/items", post(handlers::add_checklist_items))
        .with_state(state)
}
