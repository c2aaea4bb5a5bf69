use crate::traits::{CasOutcome, KeyValueStore, StorageResult, VersionedValue};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, VersionedValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<VersionedValue>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<u64> {
        let mut entries = self.entries.lock().await;
        let version = entries.get(key).map_or(0, |e| e.version) + 1;
        entries.insert(key.to_string(), VersionedValue { value, version });
        Ok(version)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> StorageResult<CasOutcome> {
        let mut entries = self.entries.lock().await;
        let current_version = entries.get(key).map(|e| e.version);
        if current_version != expected_version {
            return Ok(CasOutcome::Conflict { current_version });
        }

        let version = current_version.unwrap_or(0) + 1;
        entries.insert(key.to_string(), VersionedValue { value, version });
        Ok(CasOutcome::Swapped { version })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
