use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use learnserver::api_router::configure_api_routes;
use learnserver::config::AppConfig;
use learnserver::shared::state::AppState;
use learnserver::store::{LearnStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let store: Arc<dyn LearnStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url)?),
        None => {
            warn!("DATABASE_URL not set, falling back to the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let state = Arc::new(AppState::new(store, config.clone()));

    let app = configure_api_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.bind_addr();
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
