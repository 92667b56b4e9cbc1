use crate::card::Card;
use std::path::PathBuf;

/// Shared application state handed to every handler. The card engine is
/// internally shared, so cloning this is cheap.
#[derive(Clone)]
pub struct AppState {
    pub card: Card,
    pub config_path: PathBuf,
}

impl AppState {
    pub fn new(card: Card, config_path: PathBuf) -> Self {
        Self { card, config_path }
    }
}
