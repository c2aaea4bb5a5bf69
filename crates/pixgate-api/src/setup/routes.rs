//! Route configuration and setup

mod health;

use crate::constants::PRODUCTS_PATH;
use crate::handlers;
use crate::middleware::{error_envelope_middleware, image_validation_middleware, request_id_middleware};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use pixgate_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use health::{liveness_check, readiness_check};

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .merge(public_routes(state.clone()))
        .merge(settings_routes())
        .merge(stats_routes())
        .merge(product_routes(state.clone()))
        .merge(webhook_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error_envelope_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(config.server.max_request_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    let cors = if config.server.cors_origins.iter().any(|o| o == "*") {
        if config.server.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .server
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

/// Health and documentation routes
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(liveness_check))
        .route(
            "/health/ready",
            get({
                let state = state.clone();
                move || async move { readiness_check(state).await }
            }),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn settings_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/settings",
        get(handlers::settings::get_settings).post(handlers::settings::update_settings),
    )
}

fn stats_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stats", get(handlers::stats::get_stats))
}

/// Catalog writes, gated by pre-commit image validation
fn product_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            PRODUCTS_PATH,
            post(handlers::products::accept_product_write)
                .put(handlers::products::accept_product_write),
        )
        .route(
            &format!("{}/{{id}}", PRODUCTS_PATH),
            put(handlers::products::accept_product_write),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            image_validation_middleware,
        ))
}

fn webhook_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/webhooks/products/create",
            post(handlers::webhooks::products_create),
        )
        .route(
            "/api/webhooks/products/update",
            post(handlers::webhooks::products_update),
        )
}
