//! Error types for the Vaidya model server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::result;

/// A specialized Result type for Vaidya operations.
pub type Result<T> = result::Result<T, Error>;

/// Detail reported for errors whose message must not reach the caller.
pub const INTERNAL_ERROR_DETAIL: &str = "Internal Server Error";

/// The error type for Vaidya operations.
#[derive(Debug)]
pub enum Error {
    /// Client sent something that cannot be processed (bad upload, undecodable image)
    InvalidInput(String),
    /// Request body failed schema validation
    Validation(String),
    /// Upload exceeds the configured body limit
    PayloadTooLarge(String),
    /// A model artifact is missing on disk
    ModelNotFound(PathBuf),
    /// A model artifact exists but could not be loaded
    ModelLoad(String),
    /// Image model execution or output decoding failed
    Inference(String),
    /// Tabular ONNX session or output decoding failed
    OnnxInference(String),
    /// Configuration errors, including malformed scaling descriptors
    Config(String),
    /// Prediction log errors
    Storage(String),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Internal errors
    Internal(String),
}

impl Error {
    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to hand back to the caller.
    pub fn is_classified(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Serialization(_) | Error::Internal(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "{}", msg),
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::PayloadTooLarge(msg) => write!(f, "{}", msg),
            Error::ModelNotFound(path) => {
                write!(f, "Model load error: {} not found", path.display())
            }
            Error::ModelLoad(msg) => write!(f, "Model load error: {}", msg),
            Error::Inference(msg) => write!(f, "Inference error: {}", msg),
            Error::OnnxInference(msg) => write!(f, "ONNX inference failed: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("blocking task failed: {}", err))
    }
}

/// Wire format of an error response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }

    pub fn internal() -> Self {
        Self::new(INTERNAL_ERROR_DETAIL)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = if self.is_classified() {
            if status.is_server_error() {
                tracing::error!(error = %self, "request failed");
            } else {
                tracing::debug!(error = %self, "rejected request");
            }
            ErrorBody::new(self.to_string())
        } else {
            tracing::error!(error = ?self, "unhandled error in request path");
            ErrorBody::internal()
        };
        (status, Json(body)).into_response()
    }
}
