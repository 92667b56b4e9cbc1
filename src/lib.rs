pub mod app;
pub mod card;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod projection;
pub mod state;
pub mod store;
pub mod ui;

pub use app::router;
pub use card::Card;
pub use state::AppState;
pub use store::{FileStore, HttpStore, StoreClient};
