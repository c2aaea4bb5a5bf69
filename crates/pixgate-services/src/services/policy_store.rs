//! Per-tenant policy ownership

use std::sync::Arc;

use pixgate_core::{InvalidPolicy, Policy};
use pixgate_storage::{policy_key, KeyValueStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error(transparent)]
    Invalid(#[from] InvalidPolicy),

    #[error("Policy storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Holds the active policy of every tenant.
///
/// Tenants that never saved a policy get the configured default. Writes are
/// last-write-wins and no history is kept.
pub struct PolicyStore {
    store: Arc<dyn KeyValueStore>,
    default_policy: Policy,
}

impl PolicyStore {
    pub fn new(store: Arc<dyn KeyValueStore>, default_policy: Policy) -> Self {
        Self {
            store,
            default_policy,
        }
    }

    pub fn default_policy(&self) -> Policy {
        self.default_policy
    }

    pub async fn get(&self, tenant_id: &str) -> Result<Policy, StorageError> {
        let key = policy_key(tenant_id)?;
        match self.store.get(&key).await? {
            Some(record) => serde_json::from_slice(&record.value).map_err(|e| StorageError::Corrupt {
                key,
                message: e.to_string(),
            }),
            None => Ok(self.default_policy),
        }
    }

    /// Validate and persist a policy. On any failure the previous policy stays active.
    #[tracing::instrument(skip_all, fields(tenant_id = %tenant_id))]
    pub async fn set(&self, tenant_id: &str, policy: Policy) -> Result<Policy, PolicyError> {
        policy.validate()?;

        let key = policy_key(tenant_id)?;
        let body = serde_json::to_vec(&policy)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode policy: {}", e)))?;
        let version = self.store.put(&key, body).await?;

        tracing::info!(
            version = version,
            max_bytes = policy.max_bytes,
            min_dimension_px = policy.min_dimension_px,
            max_dimension_px = policy.max_dimension_px,
            "Policy updated"
        );
        Ok(policy)
    }
}
