use crate::constants::{WEBHOOK_ID_HEADER, WEBHOOK_TOPIC_HEADER};
use crate::error::HttpAppError;
use crate::extractors::TenantContext;
use crate::state::AppState;
use crate::webhooks::{ProductPayload, WebhookDelivery, WebhookTopic};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use pixgate_core::AppError;
use serde_json::json;
use std::sync::Arc;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn receive(
    state: &AppState,
    topic: WebhookTopic,
    tenant: TenantContext,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let payload: ProductPayload = serde_json::from_slice(body)
        .map_err(|e| HttpAppError(AppError::BadRequest(format!("Invalid webhook payload: {}", e))))?;

    let delivery_id = header_value(headers, WEBHOOK_ID_HEADER);
    tracing::info!(
        topic = %topic,
        header_topic = ?header_value(headers, WEBHOOK_TOPIC_HEADER),
        tenant_id = %tenant.tenant_id,
        delivery_id = ?delivery_id,
        "Webhook received"
    );

    if !state.webhooks.admit(delivery_id.as_deref()).await {
        tracing::info!(delivery_id = ?delivery_id, "Duplicate webhook delivery ignored");
        return Ok((StatusCode::OK, Json(json!({ "status": "duplicate" }))));
    }

    let delivery = WebhookDelivery {
        topic,
        tenant_id: tenant.tenant_id,
        delivery_id,
        images: payload.image_urls(),
    };

    let processor = state.webhooks.clone();
    tokio::spawn(async move {
        processor.process(delivery).await;
    });

    Ok((StatusCode::OK, Json(json!({ "status": "accepted" }))))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/products/create",
    tag = "webhooks",
    request_body(content = Vec<u8>, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery acknowledged; images validate in the background"),
        (status = 400, description = "Malformed payload or missing shop", body = crate::error::ErrorResponse)
    )
)]
pub async fn products_create(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    receive(&state, WebhookTopic::ProductsCreate, tenant, &headers, &body).await
}

#[utoipa::path(
    post,
    path = "/api/webhooks/products/update",
    tag = "webhooks",
    request_body(content = Vec<u8>, content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery acknowledged; images validate in the background"),
        (status = 400, description = "Malformed payload or missing shop", body = crate::error::ErrorResponse)
    )
)]
pub async fn products_update(
    State(state): State<Arc<AppState>>,
    tenant: TenantContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    receive(&state, WebhookTopic::ProductsUpdate, tenant, &headers, &body).await
}
