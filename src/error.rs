//! Error types for the gateway.
//!
//! Defines the main error enum used throughout the application and its
//! translation into an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A required request field is absent or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Warehouse session could not be established (auth failed, host unreachable, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution or fetch errors (syntax errors, permission denied, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// The result schema did not match the returned rows.
    #[error("Result shaping error: {0}")]
    Shaping(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a shaping error with the given message.
    pub fn shaping(msg: impl Into<String>) -> Self {
        Self::Shaping(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    ///
    /// Shaping failures are reported as query errors.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) | Self::Shaping(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the bare message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Connection(msg)
            | Self::Query(msg)
            | Self::Shaping(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// HTTP status used when the error reaches a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct JsonErrorResponse {
    error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.message().to_string();

        tracing::warn!(
            "Returning {} with status code {status}: {error}",
            self.category()
        );
        (status, Json(JsonErrorResponse { error })).into_response()
    }
}

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;
