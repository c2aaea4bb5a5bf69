//! HTTP error response conversion
//!
//! **Handler pattern:** return `Result<impl IntoResponse, HttpAppError>` and convert
//! domain errors with `?`; every failure then renders as the same `ErrorResponse`
//! shape. Request id and detail redaction are applied afterwards by
//! `error_envelope_middleware`, which has access to the application state.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixgate_core::{AppError, ErrorMetadata, LogLevel};
use pixgate_services::{EngineError, PolicyError, StatsError, StorageError};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Correlates the response with server logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        let (details, error_type) = if error.is_sensitive() {
            (None, None)
        } else {
            (
                Some(error.detailed_message()),
                Some(error.error_type().to_string()),
            )
        };

        Self {
            error: error.client_message(),
            details,
            error_type,
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
            request_id: None,
        }
    }

    pub fn redact(mut self) -> Self {
        self.details = None;
        self.error_type = None;
        self
    }
}

/// Wrapper type for AppError to implement IntoResponse
///
/// Needed because of the orphan rule: IntoResponse is foreign and so is AppError.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(AppError::from(err))
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error);
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

fn storage_app_error(err: StorageError) -> AppError {
    match err {
        StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
        StorageError::ConfigError(msg) => AppError::Internal(msg),
        other => AppError::Storage(other.to_string()),
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_app_error(err))
    }
}

impl From<PolicyError> for HttpAppError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Invalid(invalid) => HttpAppError(AppError::from(invalid)),
            PolicyError::Storage(storage) => HttpAppError::from(storage),
        }
    }
}

impl From<StatsError> for HttpAppError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Storage(storage) => HttpAppError::from(storage),
            contention @ StatsError::Contention { .. } => {
                HttpAppError(AppError::Internal(contention.to_string()))
            }
        }
    }
}

impl From<EngineError> for HttpAppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::PolicyUnavailable { source, .. } => HttpAppError::from(source),
            EngineError::Internal(msg) => HttpAppError(AppError::Internal(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixgate_core::InvalidPolicy;

    #[test]
    fn test_rejection_renders_reason() {
        let body = ErrorResponse::from_app_error(&AppError::ImageRejected {
            url: "https://cdn.example.com/a.png".to_string(),
            reason: "exceeds maximum size".to_string(),
        });
        assert_eq!(body.error, "exceeds maximum size");
        assert_eq!(body.code, "IMAGE_REJECTED");
        assert!(body.details.unwrap().contains("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let body = ErrorResponse::from_app_error(&AppError::Storage("disk on fire".to_string()));
        assert_eq!(body.error, "Failed to access storage");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_domain_error_mapping() {
        let err = HttpAppError::from(PolicyError::Invalid(InvalidPolicy("bad".to_string())));
        assert_eq!(err.0.error_code(), "INVALID_POLICY");

        let err = HttpAppError::from(StorageError::InvalidKey("tenant".to_string()));
        assert_eq!(err.0.http_status_code(), 400);

        let err = HttpAppError::from(StorageError::ReadFailed("down".to_string()));
        assert_eq!(err.0.http_status_code(), 500);
    }

    #[test]
    fn test_into_response_status_and_extension() {
        let response = HttpAppError(AppError::MissingTenant).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.extensions().get::<ErrorResponse>().unwrap();
        assert_eq!(body.error, "Shop parameter missing");
    }
}
