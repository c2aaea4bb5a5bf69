//! Key-value store abstraction
//!
//! This module defines the KeyValueStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Corrupt record at {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A stored value together with the version it was written at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: u64,
}

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The value was written and now has `version`
    Swapped { version: u64 },
    /// Another writer got there first; nothing was written
    Conflict { current_version: Option<u64> },
}

impl CasOutcome {
    pub fn is_swapped(&self) -> bool {
        matches!(self, CasOutcome::Swapped { .. })
    }
}

/// Key-value store abstraction
///
/// Versions start at 1 for the first write of a key and increase by one on every
/// successful write. A key that was never written has no version.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the current value and version of a key
    async fn get(&self, key: &str) -> StorageResult<Option<VersionedValue>>;

    /// Unconditionally write a value, returning its new version
    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<u64>;

    /// Write `value` only if the key is still at `expected_version`.
    ///
    /// `None` means "the key must not exist yet".
    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> StorageResult<CasOutcome>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
