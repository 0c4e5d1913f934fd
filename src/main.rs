// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SukuSuku.ai API Server
//!
//! Accounts, credits and embed tokens for the SukuSuku.ai marketing site
//! and its externally hosted Penora and ImageGene tools.

use std::sync::Arc;
use std::time::Duration;

use sukusuku_api::{
    config::Config,
    db::{MemoryStorage, PgStorage, Storage},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired auth tokens are swept from storage.
const TOKEN_SWEEP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting SukuSuku.ai API");

    // Connect storage: Postgres when configured, in-memory otherwise
    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            let pg = PgStorage::connect(url).await?;
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is not persisted)");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.google_client_id.is_none() || config.google_client_secret.is_none() {
        tracing::warn!("Google OAuth credentials not set, Google login is disabled");
    }

    let state = Arc::new(AppState::new(config.clone(), storage));

    spawn_token_sweeper(state.clone());

    // Build router
    let app = sukusuku_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically delete expired session and embed tokens.
fn spawn_token_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(TOKEN_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match state.storage.delete_expired_tokens(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Swept expired tokens"),
                Err(e) => tracing::warn!(error = %e, "Token sweep failed"),
            }
        }
    });
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sukusuku_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
