use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddoneout::{api, config::ServerConfig, state::AppState, store::MemoryStore, words, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddoneout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Odd One Out...");

    let config = ServerConfig::from_env();

    let word_pairs = match &config.word_pairs_path {
        Some(path) => match words::load_pool(path) {
            Ok(pairs) if !pairs.is_empty() => pairs,
            Ok(_) => {
                tracing::warn!(
                    "{} contains no usable word pairs, using built-in pool",
                    path.display()
                );
                words::default_pool()
            }
            Err(e) => {
                tracing::warn!("Failed to load word pairs: {}. Using built-in pool.", e);
                words::default_pool()
            }
        },
        None => words::default_pool(),
    };

    let store = Arc::new(MemoryStore::with_word_pairs(word_pairs));
    let state = Arc::new(AppState::with_store(store, config.game.clone()));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
