//! Error handling module for the directory backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::StoreError;
use crate::generation::CompletionError;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNKNOWN_CATEGORY: &str = "UNKNOWN_CATEGORY";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const PARTIAL_WRITE_FAILURE: &str = "PARTIAL_WRITE_FAILURE";
    pub const UPSTREAM_FAILURE: &str = "UPSTREAM_FAILURE";
    pub const GENERATION_FAILED: &str = "GENERATION_FAILED";
    pub const GENERATION_OUTPUT_INVALID: &str = "GENERATION_OUTPUT_INVALID";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Caller input failed validation
    Validation(String),
    /// Category token is not one of the registered institute categories
    UnknownCategory(String),
    /// Malformed request payload
    BadRequest(String),
    /// Identity absent from every probed table
    NotFound(String),
    /// One half of a paired write landed, the other did not
    PartialWrite {
        identity: String,
        written: Vec<String>,
        failed: Vec<String>,
        rolled_back: bool,
        cause: String,
    },
    /// Table store returned an error
    Upstream(String),
    /// Completion service call failed
    Generation(String),
    /// Completion output could not be repaired into a JSON object
    GenerationOutputInvalid(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PartialWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::GenerationOutputInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::UnknownCategory(_) => codes::UNKNOWN_CATEGORY,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::PartialWrite { .. } => codes::PARTIAL_WRITE_FAILURE,
            AppError::Upstream(_) => codes::UPSTREAM_FAILURE,
            AppError::Generation(_) => codes::GENERATION_FAILED,
            AppError::GenerationOutputInvalid(_) => codes::GENERATION_OUTPUT_INVALID,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::UnknownCategory(token) => format!("Unknown institute category '{}'", token),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::PartialWrite {
                identity,
                written,
                failed,
                cause,
                ..
            } => format!(
                "Record {} only partially written (written: [{}], failed: [{}]): {}",
                identity,
                written.join(", "),
                failed.join(", "),
                cause
            ),
            AppError::Upstream(msg) => msg.clone(),
            AppError::Generation(msg) => msg.clone(),
            AppError::GenerationOutputInvalid(msg) => msg.clone(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::PartialWrite {
                identity,
                written,
                failed,
                rolled_back,
                ..
            } => Some(serde_json::json!({
                "identity": identity,
                "written": written,
                "failed": failed,
                "rolled_back": rolled_back,
            })),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Storage error: {:?}", err);
        AppError::Upstream(format!("Storage error: {}", err))
    }
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        tracing::error!("Completion error: {:?}", err);
        AppError::Generation(format!("Generation failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details: error.details(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
