use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ErrorResponse;
use crate::middleware::get_request_id;
use crate::state::AppState;

/// Finish error bodies rendered by `HttpAppError`.
///
/// Stamps the request id onto the body and strips `details`/`error_type` unless the
/// deployment exposes error details. Responses without an `ErrorResponse` extension
/// pass through unchanged.
pub async fn error_envelope_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = get_request_id(&request);
    let mut response = next.run(request).await;

    let Some(mut body) = response.extensions_mut().remove::<ErrorResponse>() else {
        return response;
    };

    body.request_id = request_id;
    if !state.expose_error_details {
        body = body.redact();
    }

    let (mut parts, _) = response.into_parts();
    let (rendered, rendered_body) = Json(body).into_response().into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    if let Some(content_type) = rendered.headers.get(axum::http::header::CONTENT_TYPE) {
        parts
            .headers
            .insert(axum::http::header::CONTENT_TYPE, content_type.clone());
    }
    Response::from_parts(parts, rendered_body)
}
