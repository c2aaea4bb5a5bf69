//! Pixgate Services Layer
//!
//! This crate is the **business service layer**: policy and stats ownership plus the
//! validation orchestration. It re-exports the storage, processing and fetch types
//! its API needs so that the HTTP crate depends on a single service facade.

pub mod services;

pub use pixgate_infra::{AssetFetcher, FetchError, FetchLimits, HttpAssetFetcher, TenantLimiter};
pub use pixgate_processing::{MetadataProbe, PolicyEvaluator, ProbeError};
pub use pixgate_storage::{
    create_store, CasOutcome, KeyValueStore, LocalStore, MemoryStore, StorageBackend,
    StorageError, StorageResult, VersionedValue,
};
pub use services::engine::{EngineError, ValidationEngine};
pub use services::policy_store::{PolicyError, PolicyStore};
pub use services::stats::{StatsAggregator, StatsError};
