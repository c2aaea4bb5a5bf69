//! Application setup and initialization
//!
//! Everything main.rs needs to go from a loaded `Config` to a running router.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use pixgate_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    pixgate_infra::init_telemetry(config.server.log_json)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.server.environment,
        storage_backend = ?config.storage.backend,
        "Configuration loaded and validated successfully"
    );

    let state = services::initialize_services(&config).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
