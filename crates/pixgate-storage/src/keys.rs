//! Centralized storage key generation
//!
//! Tenant identifiers are shop domains; they are embedded verbatim so stored records
//! stay readable, which means they must not be able to escape their prefix.

use crate::traits::{StorageError, StorageResult};

fn tenant_prefix(tenant_id: &str) -> StorageResult<String> {
    let tenant_id = tenant_id.trim();
    if tenant_id.is_empty() {
        return Err(StorageError::InvalidKey("tenant id is empty".to_string()));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':');
    if tenant_id.contains("..") || !tenant_id.chars().all(allowed) {
        return Err(StorageError::InvalidKey(format!(
            "tenant id contains invalid characters: {}",
            tenant_id
        )));
    }

    Ok(format!("tenants/{}", tenant_id.to_lowercase()))
}

pub fn policy_key(tenant_id: &str) -> StorageResult<String> {
    Ok(format!("{}/policy", tenant_prefix(tenant_id)?))
}

pub fn stats_key(tenant_id: &str) -> StorageResult<String> {
    Ok(format!("{}/stats", tenant_prefix(tenant_id)?))
}
