//! Per-tenant outcome counters

use std::sync::Arc;

use pixgate_core::{Stats, Verdict};
use pixgate_storage::{stats_key, CasOutcome, KeyValueStore, StorageError};

/// Upper bound on conditional write attempts for one record.
///
/// A writer only loses a round to another writer that then finishes, so this also
/// bounds how many concurrent recorders per tenant are tolerated without an error.
const MAX_CAS_ATTEMPTS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Stats storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Stats update gave up after {attempts} conflicting writes")]
    Contention { attempts: usize },
}

/// Folds verdicts into each tenant's stats record.
///
/// Every record is a read-modify-write guarded by a versioned compare-and-swap, so
/// concurrent verdicts for one tenant never overwrite each other.
pub struct StatsAggregator {
    store: Arc<dyn KeyValueStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the stats as written by this call.
    pub async fn record(
        &self,
        tenant_id: &str,
        verdict: &Verdict,
        baseline_bytes: u64,
    ) -> Result<Stats, StatsError> {
        let key = stats_key(tenant_id)?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let (mut stats, version) = match self.store.get(&key).await? {
                Some(record) => (decode(&key, &record.value)?, Some(record.version)),
                None => (Stats::default(), None),
            };

            stats.apply(verdict, baseline_bytes);
            let body = serde_json::to_vec(&stats)
                .map_err(|e| StorageError::WriteFailed(format!("Failed to encode stats: {}", e)))?;

            match self.store.compare_and_swap(&key, version, body).await? {
                CasOutcome::Swapped { .. } => return Ok(stats),
                CasOutcome::Conflict { current_version } => {
                    tracing::debug!(
                        tenant_id = %tenant_id,
                        attempt = attempt,
                        expected_version = ?version,
                        current_version = ?current_version,
                        "Stats write conflict, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(StatsError::Contention {
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Tenants with nothing recorded read as zeroed stats.
    pub async fn get(&self, tenant_id: &str) -> Result<Stats, StatsError> {
        let key = stats_key(tenant_id)?;
        match self.store.get(&key).await? {
            Some(record) => Ok(decode(&key, &record.value)?),
            None => Ok(Stats::default()),
        }
    }
}

fn decode(key: &str, value: &[u8]) -> Result<Stats, StorageError> {
    serde_json::from_slice(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}
