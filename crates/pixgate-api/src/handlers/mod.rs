pub mod products;
pub mod settings;
pub mod stats;
pub mod webhooks;
