use crate::{KeyValueStore, LocalStore, MemoryStore, StorageBackend, StorageError, StorageResult};
use pixgate_core::StorageConfig;
use std::sync::Arc;

/// Create a key-value store based on configuration
pub async fn create_store(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; policies and stats are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Local => {
            let base_path = config.local_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_requires_path() {
        let config = StorageConfig {
            backend: StorageBackend::Local,
            local_path: None,
        };
        assert!(matches!(
            create_store(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_creates_requested_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Local,
            local_path: Some(dir.path().display().to_string()),
        };
        let store = create_store(&config).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Local);

        let store = create_store(&StorageConfig::default()).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Memory);
    }
}
