//! Service wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use pixgate_core::Config;
use pixgate_services::{create_store, HttpAssetFetcher};
use std::sync::Arc;

/// Build the store and fetcher from configuration and wire them into the state.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let store = create_store(&config.storage)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %store.backend_type(), "Storage initialized");

    let fetcher =
        HttpAssetFetcher::new(config.fetch.clone()).context("Failed to build HTTP fetcher")?;

    tracing::info!(
        timeout_ms = config.fetch.timeout.as_millis() as u64,
        max_response_bytes = config.fetch.max_response_bytes,
        max_retries = config.fetch.max_retries,
        allow_private_ips = config.fetch.allow_private_ips,
        "Asset fetcher initialized"
    );

    Ok(Arc::new(AppState::new(config, store, Arc::new(fetcher))))
}
