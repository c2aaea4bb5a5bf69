use crate::error::HttpAppError;
use crate::extractors::TenantContext;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use pixgate_core::Stats;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Render a byte count for the dashboard: `"0 B"`, `"512 B"`, `"1.2 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Dashboard view of a tenant's stats
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_images: u64,
    pub rejected_images: u64,
    /// Human-readable, e.g. `"1.2 MB"`
    pub storage_saved: String,
    /// Human-readable mean size of accepted images
    pub average_size: String,
    pub storage_saved_bytes: u64,
    pub average_size_bytes: u64,
    pub policy_rejections: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
    pub timeouts: u64,
}

impl From<&Stats> for StatsSummary {
    fn from(stats: &Stats) -> Self {
        Self {
            total_images: stats.total_images,
            rejected_images: stats.rejected_images,
            storage_saved: format_bytes(stats.storage_saved_bytes),
            average_size: format_bytes(stats.average_size_bytes()),
            storage_saved_bytes: stats.storage_saved_bytes,
            average_size_bytes: stats.average_size_bytes(),
            policy_rejections: stats.policy_rejections,
            fetch_failures: stats.fetch_failures,
            decode_failures: stats.decode_failures,
            timeouts: stats.timeouts,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    params(
        ("shop" = Option<String>, Query, description = "Shop domain, if X-Shopify-Shop-Domain is not sent")
    ),
    responses(
        (status = 200, description = "Validation stats for the shop", body = StatsSummary),
        (status = 400, description = "Shop parameter missing", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage error", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = state.stats.get(&tenant.tenant_id).await?;
    Ok(Json(StatsSummary::from(&stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_tiers() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1_258_291), "1.2 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_summary_from_stats() {
        let stats = Stats {
            total_images: 3,
            rejected_images: 1,
            storage_saved_bytes: 1_258_291,
            accepted_bytes_total: 2048,
            policy_rejections: 1,
            ..Stats::default()
        };
        let summary = StatsSummary::from(&stats);
        assert_eq!(summary.storage_saved, "1.2 MB");
        assert_eq!(summary.average_size, "1.0 KB");
        assert_eq!(summary.average_size_bytes, 1024);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalImages"], 3);
        assert_eq!(json["rejectedImages"], 1);
        assert_eq!(json["storageSaved"], "1.2 MB");
    }
}
