//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use pixgate_core::models;

/// Returns the OpenAPI document for the public endpoints.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pixgate API",
        version = "0.1.0",
        description = "Image compliance validation for product catalogs. Shops configure size and dimension bounds; product images are checked on write and again when product webhooks arrive."
    ),
    paths(
        // Settings
        handlers::settings::get_settings,
        handlers::settings::update_settings,
        // Stats
        handlers::stats::get_stats,
        // Products
        handlers::products::accept_product_write,
        // Webhooks
        handlers::webhooks::products_create,
        handlers::webhooks::products_update,
    ),
    components(
        schemas(
            models::PolicySettings,
            models::Verdict,
            models::RejectionKind,
            models::ImageMetadata,
            models::ImageFormatKind,
            handlers::stats::StatsSummary,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "settings", description = "Per-shop image policy"),
        (name = "stats", description = "Validation counters"),
        (name = "products", description = "Pre-commit validation of product writes"),
        (name = "webhooks", description = "Product webhook listener")
    )
)]
pub struct ApiDoc;
