use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_core::ClinicError;
use serde_json::json;

/// Error response rendered as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Create validation error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Create not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Create server error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ClinicError> for ApiError {
    fn from(e: ClinicError) -> Self {
        match e {
            ClinicError::Validation(msg) => ApiError::bad_request(msg),
            ClinicError::NotFound(msg) => ApiError::not_found(msg),
            ClinicError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                ApiError::internal_error("Database error")
            }
            ClinicError::Certificate(e) => {
                tracing::error!(error = %e, "certificate generation failed");
                ApiError::internal_error(format!("Could not generate certificate: {}", e))
            }
            ClinicError::Lock(msg) => {
                tracing::error!(error = %msg, "store lock poisoned");
                ApiError::internal_error("Database error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
