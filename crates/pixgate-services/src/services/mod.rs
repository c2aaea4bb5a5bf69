pub mod engine;
pub mod policy_store;
pub mod stats;
