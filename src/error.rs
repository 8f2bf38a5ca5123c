use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod app_error;

pub use app_error::AppError;

/// Error classification for different types of errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (4xx)
    BadRequest,
    Forbidden,
    NotFound,
    ValidationError,

    // Server errors (5xx)
    InternalServerError,
}

impl ErrorCode {
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::ValidationError => 400,
            ErrorCode::InternalServerError => 500,
        }
    }
}

/// Structured error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
    pub status: u16,
}

/// Details of an error occurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub request_id: String,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Builder for creating error responses
pub struct ErrorResponseBuilder {
    code: ErrorCode,
    message: String,
    details: Option<String>,
    request_id: String,
    timestamp: String,
    path: String,
    method: String,
    context: HashMap<String, serde_json::Value>,
}

impl ErrorResponseBuilder {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            request_id: "unknown".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            path: "/".to_string(),
            method: "GET".to_string(),
            context: HashMap::new(),
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ErrorResponse {
        ErrorResponse {
            status: self.code.status(),
            error: ErrorDetails {
                code: self.code,
                message: self.message,
                details: self.details,
                request_id: self.request_id,
                timestamp: self.timestamp,
                path: self.path,
                method: self.method,
                context: self.context,
            },
        }
    }
}

/// Helper functions for common error types
pub mod errors {
    use super::*;

    pub fn not_found(path: &str, method: &str, request_id: &str) -> ErrorResponse {
        ErrorResponseBuilder::new(ErrorCode::NotFound, "Resource not found")
            .path(path)
            .method(method)
            .request_id(request_id)
            .build()
    }

    /// Generic failure; the cause is logged, never returned.
    pub fn internal_server_error(path: &str, method: &str, request_id: &str) -> ErrorResponse {
        ErrorResponseBuilder::new(ErrorCode::InternalServerError, "Internal server error")
            .path(path)
            .method(method)
            .request_id(request_id)
            .build()
    }
}
