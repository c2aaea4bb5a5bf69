use crate::traits::{CasOutcome, KeyValueStore, StorageError, StorageResult, VersionedValue};
use crate::StorageBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// On-disk record: the version travels with the value
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u64,
    value: String,
}

/// Local filesystem store
///
/// Each key maps to one JSON file under `base_path`. Writes go to a temporary file
/// that is renamed into place, so readers never observe a partial record.
/// Conditional writes are serialized within the process; the directory must not be
/// shared between processes.
pub struct LocalStore {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for records (e.g., "/var/lib/pixgate")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty()
            || key.contains("..")
            || key.starts_with('/')
            || key.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                key
            )));
        }

        let path = self.base_path.join(format!("{}.json", key));
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    async fn read_record(&self, key: &str, path: &Path) -> StorageResult<Option<VersionedValue>> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let envelope: Envelope = serde_json::from_slice(&raw).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let value = STANDARD
            .decode(envelope.value.as_bytes())
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(VersionedValue {
            value,
            version: envelope.version,
        }))
    }

    async fn write_record(&self, path: &Path, version: u64, value: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let envelope = Envelope {
            version,
            value: STANDARD.encode(value),
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode record: {}", e)))?;

        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;
        file.write_all(&body).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", tmp_path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", tmp_path.display(), e))
        })?;
        drop(file);

        fs::rename(&tmp_path, path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to move record into {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), version = version, "Record written");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> StorageResult<Option<VersionedValue>> {
        let path = self.key_to_path(key)?;
        self.read_record(key, &path).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        let _guard = self.write_lock.lock().await;

        let version = self
            .read_record(key, &path)
            .await?
            .map_or(0, |r| r.version)
            + 1;
        self.write_record(&path, version, &value).await?;
        Ok(version)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> StorageResult<CasOutcome> {
        let path = self.key_to_path(key)?;
        let _guard = self.write_lock.lock().await;

        let current_version = self.read_record(key, &path).await?.map(|r| r.version);
        if current_version != expected_version {
            return Ok(CasOutcome::Conflict { current_version });
        }

        let version = current_version.unwrap_or(0) + 1;
        self.write_record(&path, version, &value).await?;
        Ok(CasOutcome::Swapped { version })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
