use crate::error::{HttpAppError, ValidatedJson};
use crate::extractors::TenantContext;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use pixgate_core::PolicySettings;
use std::sync::Arc;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    params(
        ("shop" = Option<String>, Query, description = "Shop domain, if X-Shopify-Shop-Domain is not sent")
    ),
    responses(
        (status = 200, description = "Current policy settings, or the defaults", body = PolicySettings),
        (status = 400, description = "Shop parameter missing", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage error", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let policy = state.policies.get(&tenant.tenant_id).await?;
    Ok(Json(PolicySettings::from(policy)))
}

#[utoipa::path(
    post,
    path = "/api/settings",
    tag = "settings",
    params(
        ("shop" = Option<String>, Query, description = "Shop domain, if X-Shopify-Shop-Domain is not sent")
    ),
    request_body = PolicySettings,
    responses(
        (status = 200, description = "Settings saved", body = PolicySettings),
        (status = 400, description = "Invalid settings", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage error", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    ValidatedJson(settings): ValidatedJson<PolicySettings>,
) -> Result<impl IntoResponse, HttpAppError> {
    settings.validate()?;

    let stored = state
        .policies
        .set(&tenant.tenant_id, settings.to_policy())
        .await?;

    Ok(Json(PolicySettings::from(stored)))
}
