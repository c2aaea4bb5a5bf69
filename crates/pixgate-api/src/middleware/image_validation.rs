//! Pre-commit image validation for catalog writes
//!
//! Product create/update bodies are inspected before the write is forwarded. Images
//! are validated in payload order and the first rejection fails the request.

use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pixgate_core::{AppError, ImageRef};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::extractors::resolve_tenant;
use crate::state::AppState;

/// Number of images that passed pre-commit validation, for downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedImages(pub usize);

#[derive(Debug, Deserialize)]
struct ProductWrite {
    product: Option<ProductBody>,
}

#[derive(Debug, Deserialize)]
struct ProductBody {
    #[serde(default)]
    images: Vec<ProductImage>,
}

#[derive(Debug, Deserialize)]
struct ProductImage {
    src: Option<String>,
}

fn image_sources(body: &[u8]) -> Option<Vec<String>> {
    let write: ProductWrite = serde_json::from_slice(body).ok()?;
    let images = write.product.map(|p| p.images).unwrap_or_default();
    Some(
        images
            .into_iter()
            .filter_map(|image| image.src)
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty())
            .collect(),
    )
}

pub async fn image_validation_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !matches!(*request.method(), Method::POST | Method::PUT) {
        return next.run(request).await;
    }

    match validate_request(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn validate_request(state: &AppState, request: Request) -> Result<Request, HttpAppError> {
    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.max_request_body_bytes)
        .await
        .map_err(|e| HttpAppError(AppError::PayloadTooLarge(e.to_string())))?;

    let Some(sources) = image_sources(&bytes) else {
        return Ok(Request::from_parts(parts, Body::from(bytes)));
    };

    // A tenant is required only once there are images to validate.
    let tenant_id = resolve_tenant(&parts.headers, &parts.uri)
        .ok_or(HttpAppError(AppError::MissingTenant))?;

    for src in &sources {
        let verdict = state
            .engine
            .validate(&ImageRef::new(src.clone(), tenant_id.clone()))
            .await?;

        if !verdict.valid {
            let reason = verdict.reason.unwrap_or_default();
            tracing::info!(
                tenant_id = %tenant_id,
                url = %src,
                reason = %reason,
                "Product write blocked by image policy"
            );
            return Err(HttpAppError(AppError::ImageRejected {
                url: src.clone(),
                reason,
            }));
        }
    }

    parts.extensions.insert(ValidatedImages(sources.len()));
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_sources_skips_missing_src() {
        let body = br#"{"product": {"title": "Mug", "images": [{"src": "https://cdn.example.com/a.png"}, {"alt": "no src"}]}}"#;
        assert_eq!(
            image_sources(body),
            Some(vec!["https://cdn.example.com/a.png".to_string()])
        );
    }

    #[test]
    fn test_image_sources_without_product() {
        assert_eq!(image_sources(br#"{"title": "Mug"}"#), Some(vec![]));
        assert_eq!(image_sources(br#"{"product": {"title": "Mug"}}"#), Some(vec![]));
    }

    #[test]
    fn test_image_sources_non_json() {
        assert_eq!(image_sources(b"title=Mug"), None);
        assert_eq!(image_sources(b""), None);
    }
}
