/// Unified error types for hashvault
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the store and its HTTP boundary
#[derive(Error, Debug)]
pub enum VaultError {
    /// Request carried no payload
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Decoded payload exceeds the upload ceiling
    #[error("Payload too large: {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Request body rejected by the HTTP layer before decoding
    #[error("Request body exceeds limit of {limit} bytes")]
    RequestTooLarge { limit: usize },

    /// Payload could not be decoded or canonicalized
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Retrieval filename failed the key format
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Well-formed key with no stored object
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Short machine-readable code used in response bodies and metrics
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::MissingInput(_) => "MissingInput",
            VaultError::PayloadTooLarge { .. } | VaultError::RequestTooLarge { .. } => {
                "PayloadTooLarge"
            }
            VaultError::InvalidImage(_) => "InvalidImage",
            VaultError::InvalidKey(_) => "InvalidKey",
            VaultError::NotFound(_) => "NotFound",
            VaultError::Storage(_)
            | VaultError::Config(_)
            | VaultError::Internal(_)
            | VaultError::Io(_) => "InternalServerError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            VaultError::MissingInput(_)
            | VaultError::PayloadTooLarge { .. }
            | VaultError::RequestTooLarge { .. }
            | VaultError::InvalidImage(_)
            | VaultError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::Storage(_)
            | VaultError::Config(_)
            | VaultError::Internal(_)
            | VaultError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert VaultError to HTTP response
impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            // Decoder output stays in the server log
            VaultError::InvalidImage(_) => "Invalid image payload".to_string(),
            VaultError::Storage(_)
            | VaultError::Config(_)
            | VaultError::Internal(_)
            | VaultError::Io(_) => "Internal server error".to_string(), // Don't leak details
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request_failed");
        } else {
            tracing::debug!(error = %self, "request_rejected");
        }
        crate::metrics::record_error(code);

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for store operations
pub type VaultResult<T> = Result<T, VaultError>;
