//! Pixgate Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every pixgate component: policies, image references, verdicts and stats.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    Config, DedupConfig, EngineConfig, FetchConfig, SavingsBaseline, ServerConfig, StorageConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ImageFormatKind, ImageMetadata, ImageRef, InvalidPolicy, Policy, PolicySettings,
    RejectionCategory, RejectionKind, Stats, Verdict,
};
pub use storage_types::StorageBackend;
