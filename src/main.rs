use goal_card::config::{self, load_config};
use goal_card::{AppState, Card, FileStore, HttpStore, StoreClient, router};
use std::{env, net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config_path = config::resolve_config_path();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let store: Arc<dyn StoreClient> = match config::store_url() {
        Some(url) => {
            info!("using remote store at {url}");
            Arc::new(HttpStore::new(url))
        }
        None => {
            let counters_path = config::resolve_counters_path();
            if let Some(parent) = counters_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            info!("using file store at {}", counters_path.display());
            Arc::new(FileStore::open(counters_path).await)
        }
    };

    let card = Card::new(store);
    let raw = load_config(&config_path).await;
    card.configure(&raw).await;

    let state = AppState::new(card, config_path);
    let app = router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
