//! TAMS dashboard -- industrial anomaly tracking.
//!
//! This crate provides the core library for criticality scoring, dashboard
//! aggregation, the rule-based chat assistant, profile management, anomaly
//! intake, and the HTTP API serving them over a SQLite record store.

pub mod api;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod model;
pub mod profile;
pub mod scoring;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

/// Open the record store described by `config`.
pub fn open_store(config: &config::DashboardConfig) -> Result<storage::SqliteStore> {
    tracing::info!(db_path = %config.server.db_path, "Initializing database");
    let pool = storage::open_pool(&config.server.db_path)?;
    Ok(storage::SqliteStore::new(pool))
}

/// Start the dashboard API server and run until it stops.
pub async fn serve(config: config::DashboardConfig) -> Result<()> {
    let store: Arc<dyn storage::RecordStore> = Arc::new(open_store(&config)?);

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(api::state::AppState::new(store, Arc::new(config)));

    tracing::info!(%addr, "TAMS dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
