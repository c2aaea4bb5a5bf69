//! Pixgate API Library
//!
//! This crate provides the HTTP surface: settings and stats handlers, the pre-commit
//! image validation middleware for catalog writes, the product webhook listener,
//! error rendering and application setup.

pub mod api_doc;
pub mod constants;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
pub mod webhooks;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
pub use webhooks::{DeliveryDeduplicator, DeliveryOutcome, WebhookDelivery, WebhookProcessor};
