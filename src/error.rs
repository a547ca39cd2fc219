//! Error types for genbatch
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (validation, generation, storage, reporting)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::ProgressSnapshot;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for genbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for genbatch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "output.target_width")
        key: Option<String>,
    },

    /// Submitted batch is malformed
    #[error("invalid submission: {message}")]
    Validation {
        /// 1-based index of the offending item, if the problem is item-specific
        item: Option<usize>,
        /// What is wrong with the submission
        message: String,
    },

    /// A batch is already running
    #[error("a batch is already in progress ({}/{} handled)", .0.processed + .0.failed, .0.total)]
    BatchInProgress(Box<ProgressSnapshot>),

    /// Fetching a reference image failed
    #[error("failed to fetch reference image {url}: {reason}")]
    ReferenceFetch {
        /// The reference image URL
        url: String,
        /// Why the fetch failed
        reason: String,
    },

    /// The generation service failed
    #[error("generation failed: {0}")]
    Generation(String),

    /// Resizing a generated image failed
    #[error("resize failed for {path}: {reason}")]
    Resize {
        /// The image that could not be resized
        path: PathBuf,
        /// Why the resize failed
        reason: String,
    },

    /// Uploading to object storage failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Writing to the reporting sink failed
    #[error("report to row {row} failed: {reason}")]
    Report {
        /// Sink row
        row: u32,
        /// Why the write failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Validation error for a specific 1-based item index
    pub fn invalid_item(item: usize, message: impl Into<String>) -> Self {
        Error::Validation {
            item: Some(item),
            message: format!("item {}: {}", item, message.into()),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_in_progress",
///     "message": "a batch is already in progress (3/10 handled)",
///     "details": { "progress": { "total": 10, "processed": 3 } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error", "batch_in_progress")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation { .. } => 400,

            // 409 Conflict - one batch at a time
            Error::BatchInProgress(_) => 409,

            // 502 Bad Gateway - External service errors
            Error::ReferenceFetch { .. } => 502,
            Error::Generation(_) => 502,
            Error::Storage(_) => 502,
            Error::Report { .. } => 502,

            // 500 Internal Server Error - Server-side issues
            Error::Resize { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation { .. } => "validation_error",
            Error::BatchInProgress(_) => "batch_in_progress",
            Error::ReferenceFetch { .. } => "reference_fetch_error",
            Error::Generation(_) => "generation_error",
            Error::Resize { .. } => "resize_error",
            Error::Storage(_) => "storage_error",
            Error::Report { .. } => "report_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let mut api_error = ApiError::new(error.error_code(), error.to_string());
        api_error.error.details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Validation { item: Some(item), .. } => Some(serde_json::json!({
                "item": item,
            })),
            Error::BatchInProgress(progress) => Some(serde_json::json!({
                "progress": progress,
            })),
            Error::ReferenceFetch { url, .. } => Some(serde_json::json!({
                "url": url,
            })),
            Error::Report { row, .. } => Some(serde_json::json!({
                "row": row,
            })),
            _ => None,
        };
        api_error
    }
}
