//! # API Error Types
//!
//! Every handler returns `Result<_, ApiError>`. The error renders as a JSON
//! body `{"code": "...", "message": "..."}` with a matching status.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────┬──────────────────────────────────┐
//! │ Source                               │ Status                           │
//! ├──────────────────────────────────────┼──────────────────────────────────┤
//! │ ValidationError, EmptyOrder,         │ 400 validation_error             │
//! │ EmptyCart, InvalidTransition         │                                  │
//! │ DbError::ForeignKeyViolation         │ 400 invalid_reference            │
//! │ missing / bad bearer token           │ 401 unauthenticated              │
//! │ non-admin on an admin route          │ 403 forbidden                    │
//! │ DbError::NotFound                    │ 404 not_found                    │
//! │ UniqueViolation, Conflict,           │ 409 conflict                     │
//! │ OverlappingTax                       │                                  │
//! │ upload over the body limit           │ 413 payload_too_large            │
//! │ anything else                        │ 500 internal_error (msg echoed)  │
//! └──────────────────────────────────────┴──────────────────────────────────┘
//! ```

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use tracing::error;

/// An error that renders as an HTTP response.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "unauthenticated", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        }

        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OverlappingTax { .. } => ApiError::conflict(err.to_string()),
            CoreError::EmptyOrder
            | CoreError::EmptyCart
            | CoreError::TooManyLines { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::Validation(_) => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } | DbError::Conflict(_) => {
                ApiError::conflict(err.to_string())
            }
            DbError::ForeignKeyViolation { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_reference", err.to_string())
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(status, "payload_too_large", err.body_text())
        } else {
            ApiError::bad_request(err.body_text())
        }
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
