//! Per-tenant cap on concurrent outbound fetches

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{AcquireError, Mutex, OwnedSemaphorePermit, Semaphore};

/// Idle tenant entries are pruned once the map grows past this many tenants.
const PRUNE_THRESHOLD: usize = 1024;

/// Hands out fetch permits, at most `permits_per_tenant` at a time per tenant.
///
/// Tenants never wait on each other; a tenant at its cap only delays its own fetches.
#[derive(Clone)]
pub struct TenantLimiter {
    permits_per_tenant: usize,
    tenants: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,
}

impl TenantLimiter {
    pub fn new(permits_per_tenant: usize) -> Self {
        Self {
            permits_per_tenant: permits_per_tenant.max(1),
            tenants: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn permits_per_tenant(&self) -> usize {
        self.permits_per_tenant
    }

    /// Wait for a fetch slot. The slot is released when the permit is dropped.
    pub async fn acquire(&self, tenant_id: &str) -> Result<OwnedSemaphorePermit, AcquireError> {
        let semaphore = {
            let mut tenants = self.tenants.lock().await;
            if tenants.len() > PRUNE_THRESHOLD {
                let max = self.permits_per_tenant;
                tenants.retain(|_, s| Arc::strong_count(s) > 1 || s.available_permits() < max);
            }
            tenants
                .entry(tenant_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.permits_per_tenant)))
                .clone()
        };

        semaphore.acquire_owned().await
    }
}
