//! odk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, selects and
//! connects the store backend, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; all shared state types
//! live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use odk_daemon::{routes, state};
use odk_orders::OrderStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const ENV_ADDR: &str = "ODK_DAEMON_ADDR";
const ENV_STORE: &str = "ODK_STORE";
const ENV_ADD_ITEM_TIMEOUT_MS: &str = "ODK_ADD_ITEM_TIMEOUT_MS";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let store = build_store().await?;
    info!(backend = store.name(), "store backend ready");

    let shared = Arc::new(state::AppState::new(store, default_deadline_from_env()));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)));
    info!("odk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Select the store backend: `ODK_STORE=memory` serves the seeded in-memory
/// demo store; anything else (or unset) connects to Postgres via
/// `ODK_DATABASE_URL`.
async fn build_store() -> anyhow::Result<Arc<dyn OrderStore>> {
    match std::env::var(ENV_STORE).as_deref() {
        Ok("memory") => {
            let store = odk_store_mem::MemOrderStore::with_demo_data().await;
            Ok(Arc::new(store))
        }
        _ => {
            let pool = odk_db::connect_from_env().await?;
            Ok(Arc::new(odk_db::PgOrderStore::new(pool)))
        }
    }
}

fn default_deadline_from_env() -> Duration {
    std::env::var(ENV_ADD_ITEM_TIMEOUT_MS)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(odk_orders::mutator::DEFAULT_DEADLINE)
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var(ENV_ADDR).ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
