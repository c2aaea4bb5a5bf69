//! Application state shared by every handler

use std::sync::Arc;

use pixgate_core::Config;
use pixgate_services::{AssetFetcher, KeyValueStore, PolicyStore, StatsAggregator, ValidationEngine};

use crate::webhooks::{DeliveryDeduplicator, WebhookProcessor};

#[derive(Clone)]
pub struct AppState {
    pub policies: Arc<PolicyStore>,
    pub stats: Arc<StatsAggregator>,
    pub engine: Arc<ValidationEngine>,
    pub webhooks: WebhookProcessor,
    /// Backing store, kept for readiness checks
    pub store: Arc<dyn KeyValueStore>,
    pub expose_error_details: bool,
    pub max_request_body_bytes: usize,
}

impl AppState {
    /// Wire the services together. Configuration is consumed here and nowhere else.
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        let policies = Arc::new(PolicyStore::new(store.clone(), config.default_policy));
        let stats = Arc::new(StatsAggregator::new(store.clone()));
        let engine = Arc::new(ValidationEngine::new(
            policies.clone(),
            stats.clone(),
            fetcher,
            config.engine.clone(),
        ));
        let dedup = Arc::new(DeliveryDeduplicator::new(&config.dedup));

        Self {
            policies,
            stats,
            webhooks: WebhookProcessor::new(engine.clone(), dedup),
            engine,
            store,
            expose_error_details: config.server.expose_error_details,
            max_request_body_bytes: config.server.max_request_body_bytes,
        }
    }
}
