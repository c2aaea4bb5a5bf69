use crate::middleware::ValidatedImages;
use axum::{extract::Request, response::IntoResponse, Json};
use serde_json::json;

/// Accept a product write that passed pre-commit image validation.
///
/// The catalog itself lives on the platform; this endpoint only confirms the images.
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "products",
    responses(
        (status = 200, description = "All product images comply with the shop policy"),
        (status = 400, description = "An image was rejected or the shop is missing", body = crate::error::ErrorResponse)
    )
)]
pub async fn accept_product_write(request: Request) -> impl IntoResponse {
    let validated = request
        .extensions()
        .get::<ValidatedImages>()
        .map(|images| images.0)
        .unwrap_or(0);
    Json(json!({ "success": true, "imagesValidated": validated }))
}
