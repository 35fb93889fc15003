//! HTTP error mapping for API handlers.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use compass_core::AppError;
use serde_json::json;

/// [`AppError`] rendered as `{"error": message}` with a matching status.
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl HttpError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            err @ (AppError::ImportMismatch { .. } | AppError::NothingStaged(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Locked(msg) => (StatusCode::LOCKED, msg.clone()),
            AppError::StorageMessage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            err => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// A request body that could not be read as the expected JSON payload.
///
/// Oversized bodies keep their 413; every other rejection is a validation
/// failure.
#[derive(Debug)]
pub struct JsonBodyError(pub JsonRejection);

impl From<JsonRejection> for JsonBodyError {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for JsonBodyError {
    fn into_response(self) -> Response {
        let message = self.0.body_text();
        if self.0.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": message })),
            )
                .into_response();
        }
        HttpError(AppError::Validation(message)).into_response()
    }
}
