//! Pixgate Storage Library
//!
//! Durable per-tenant key-value storage used for policies and stats counters.
//!
//! # Key format
//!
//! Keys are tenant-scoped and generated in the `keys` module:
//!
//! - **Policy**: `tenants/{tenant_id}/policy`
//! - **Stats**: `tenants/{tenant_id}/stats`
//!
//! Every stored value carries a version. Writers that must not lose concurrent
//! updates (the stats aggregator) go through `compare_and_swap`.

pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_store;
pub use keys::{policy_key, stats_key};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use pixgate_core::StorageBackend;
pub use traits::{CasOutcome, KeyValueStore, StorageError, StorageResult, VersionedValue};
