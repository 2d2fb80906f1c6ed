//! Error types for Axiotome
//!
//! Provides the error taxonomy shared by the search and answering core:
//! - Distinct error types for each failure mode
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidInput,

    // Resource errors (4xxx)
    BookNotFound,

    // Capacity errors (6xxx)
    Busy,

    // External model errors (8xxx)
    Timeout,
    ModelError,
    ModelUnavailable,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidInput => 1001,

            ErrorCode::BookNotFound => 4002,

            ErrorCode::Busy => 6001,

            ErrorCode::Timeout => 8001,
            ErrorCode::ModelError => 8002,
            ErrorCode::ModelUnavailable => 8003,
            ErrorCode::UpstreamError => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Book not found: {id}")]
    BookNotFound { id: i64 },

    // Capacity
    #[error("Busy: {in_flight} answer requests already in flight")]
    Busy { in_flight: usize },

    // External model errors
    #[error("Model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Model error: {message}")]
    Model { message: String, retryable: bool },

    #[error("Model unavailable after {attempts} attempt(s): {message}")]
    ModelUnavailable { attempts: u32, message: String },

    /// Transport or decoding failure the model client could not classify
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AppError {
    /// Shorthand for an `InvalidInput` error on a named field
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidInput { .. } => ErrorCode::InvalidInput,
            AppError::BookNotFound { .. } => ErrorCode::BookNotFound,
            AppError::Busy { .. } => ErrorCode::Busy,
            AppError::Timeout { .. } => ErrorCode::Timeout,
            AppError::Model { .. } => ErrorCode::ModelError,
            AppError::ModelUnavailable { .. } => ErrorCode::ModelUnavailable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::BookNotFound { .. } => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::Busy { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Internal { .. } | AppError::Configuration { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 502 Bad Gateway
            AppError::Model { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,

            // 504 Gateway Timeout
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Whether a failed model call may succeed if attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout { .. } => true,
            AppError::Model { retryable, .. } => *retryable,
            AppError::HttpClient(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();
        let field = match &self {
            AppError::InvalidInput { field, .. } => field.clone(),
            _ => None,
        };

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
