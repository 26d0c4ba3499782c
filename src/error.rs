use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Signature mismatch: {0}")]
    Signature(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Invalid delivery transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Signature(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for API clients. Unexpected errors collapse into
    /// `internal_error` and never leak their message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Authorization(_) => "authorization_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Signature(_) => "signature_mismatch",
            AppError::PaymentGateway(_) => "payment_gateway_error",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
