// SPDX-License-Identifier: MIT
// Copyright 2026 EcoTrace Contributors

//! EcoTrace API Server
//!
//! Serves the leaderboard and league API and runs the nightly
//! recurring-activity backfill.

use ecotrace::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryStore, Store},
    time_utils::{Clock, SystemClock},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        "Starting EcoTrace API"
    );

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = Arc::new(AppState::new(config.clone(), store, clock));

    let league = state
        .leagues
        .ensure_permanent_league(config.system_user_id, &config.permanent_league_name)
        .await?;
    tracing::info!(league_id = %league.id, "Permanent league ready");

    if config.run_backfill_on_startup {
        state.backfill.run_once().await;
    }
    tokio::spawn(state.backfill.clone().run());

    // Build router
    let app = ecotrace::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ecotrace=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
