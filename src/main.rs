mod api;
mod aqi;
mod classifier;
mod config;
mod constants;
mod fill;
mod pipeline;
mod providers;
mod sources;
mod store;
mod types;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use reqwest::Client;
use tokio::fs;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{acquire, healthz, score};
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::store::HistoryStore;
use crate::types::AppState;
use crate::utils::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Arc::new(Config::from_env()?);
    fs::create_dir_all(cfg.records_dir())
        .await
        .with_context(|| format!("Failed to create {}", cfg.records_dir().display()))?;

    let http = Client::builder()
        .timeout(cfg.request_timeout)
        .user_agent("plantaq/1.0")
        .build()
        .context("Failed to build reqwest client")?;

    let store = Arc::new(HistoryStore::new(
        cfg.records_dir(),
        cfg.history_retention_records,
    ));
    let state = AppState {
        pipeline: Arc::new(Pipeline::new(cfg.clone(), http, store)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/acquire", get(acquire))
        .route("/v1/score", post(score))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;

    info!("plantaq service listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
