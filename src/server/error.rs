//! API Error Responses
//!
//! Maps the orchestrator's error taxonomy onto HTTP statuses with a
//! JSON error body. Database failures are logged and reported as an
//! opaque internal error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use crate::core::conversation::ConversationError;

/// Error half of every handler's return type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error_type: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication_error", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request_error", message)
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        )
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        match &err {
            ConversationError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            ConversationError::Forbidden | ConversationError::NotEditable => {
                Self::new(StatusCode::FORBIDDEN, "forbidden", err.to_string())
            }
            ConversationError::InvalidRequest(_) => Self::bad_request(err.to_string()),
            ConversationError::Conflict { .. } => {
                Self::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
            ConversationError::Upstream(source) => {
                error!(error = %source, "Upstream LLM failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream_error",
                    err.to_string(),
                )
            }
            ConversationError::Database(source) => {
                error!(error = %source, "Database failure");
                Self::internal()
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        error!(error = %err, "Database failure");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": {
                    "message": self.message,
                    "type": self.error_type
                }
            })),
        )
            .into_response()
    }
}
