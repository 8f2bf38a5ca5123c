use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::error::{ErrorCode, ErrorResponse, ErrorResponseBuilder};
use crate::repository::RepositoryError;
use crate::validation::FieldError;

/// Unified error type for everything that reaches the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Script not found: {id}")]
    NotFound { id: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Input validation failed ({} errors)", .errors.len())]
    ValidationFailed { errors: Vec<FieldError> },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    // Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Convert to HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::Forbidden { .. } => 403,
            AppError::ValidationFailed { .. } => 400,
            AppError::BadRequest { .. } => 400,
            AppError::Internal { .. } => 500,
        }
    }

    /// Convert to structured error response. Internal details are logged
    /// here and replaced by a generic message.
    pub fn to_error_response(&self, path: &str, method: &str, request_id: &str) -> ErrorResponse {
        let builder = match self {
            AppError::NotFound { id } => {
                ErrorResponseBuilder::new(ErrorCode::NotFound, "Script not found")
                    .context("id", id.clone())
            }
            AppError::Forbidden { message } => {
                ErrorResponseBuilder::new(ErrorCode::Forbidden, message.clone())
            }
            AppError::ValidationFailed { errors } => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                ErrorResponseBuilder::new(ErrorCode::ValidationError, "Input validation failed")
                    .details(messages.join("; "))
                    .context(
                        "errors",
                        serde_json::to_value(errors).unwrap_or(serde_json::Value::Null),
                    )
            }
            AppError::BadRequest { message } => {
                ErrorResponseBuilder::new(ErrorCode::BadRequest, message.clone())
            }
            AppError::Internal { message } => {
                error!("Internal error on {} {} [{}]: {}", method, path, request_id, message);
                ErrorResponseBuilder::new(ErrorCode::InternalServerError, "Internal server error")
            }
        };

        builder
            .path(path)
            .method(method)
            .request_id(request_id)
            .build()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => AppError::NotFound { id },
            RepositoryError::Forbidden(id) => AppError::Forbidden {
                message: format!("Only the owner may modify script {}", id),
            },
            RepositoryError::ValidationFailed(errors) => AppError::ValidationFailed { errors },
            other @ RepositoryError::IdSpaceExhausted { .. } => AppError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest {
            message: err.to_string(),
        }
    }
}

/// Used where no request context is at hand, e.g. extractor rejections.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_error_response("unknown", "unknown", "unknown")
            .into_response()
    }
}
