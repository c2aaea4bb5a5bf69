//! Health check handlers

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_KEY: &str = "health/probe";

/// Run an async check with timeout; returns "ready", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "ready".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness probe - the policy/stats store answers reads.
pub async fn readiness_check(state: Arc<AppState>) -> impl IntoResponse {
    let store = state.store.clone();
    let storage = run_check(
        TIMEOUT,
        async move { store.get(PROBE_KEY).await.map(drop) },
        "not_ready",
    )
    .await;

    let ready = storage == "ready";
    if !ready {
        tracing::error!(storage = %storage, "Storage readiness check failed");
    }

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "storage": storage,
            "backend": state.store.backend_type().to_string(),
        })),
    )
}
