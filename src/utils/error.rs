//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions and maps every variant to
//! an HTTP status for the request handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tokyo_map_llm::LlmError;
use tokyo_map_tools::ToolError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The model never issued a usable tool call, even after one nudge
    #[error("Parameter extraction failed: {0}")]
    ParameterExtractionFailure(String),

    /// The orchestration step bound was hit without a terminal result
    #[error("Tool steps exceeded after {0} model turns")]
    ToolStepsExceeded(usize),

    /// Non-transient geodata failure, or a transient one that outlived the retries
    #[error("Geodata backend error: {0}")]
    GeodataBackend(String),

    /// A place name could not be resolved to coordinates
    #[error("geocode failed: {0}")]
    GeocodeFailed(String),

    /// Lookup of a store id or candidate id that is not (or no longer) stored
    #[error("store_id not found: {0}")]
    UnknownStoreId(String),

    /// Malformed review context or an unusable patch
    #[error("{0}")]
    InvalidReviewPayload(String),

    /// Tool name outside the catalog of the current mode
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments that cannot be decoded
    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model provider errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn parameter_extraction(msg: impl Into<String>) -> Self {
        Self::ParameterExtractionFailure(msg.into())
    }

    pub fn geodata(msg: impl Into<String>) -> Self {
        Self::GeodataBackend(msg.into())
    }

    pub fn geocode_failed(place: impl Into<String>) -> Self {
        Self::GeocodeFailed(place.into())
    }

    pub fn unknown_store_id(id: impl Into<String>) -> Self {
        Self::UnknownStoreId(id.into())
    }

    pub fn invalid_review(msg: impl Into<String>) -> Self {
        Self::InvalidReviewPayload(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status surfaced to API callers.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownStoreId(_) => StatusCode::NOT_FOUND,
            Self::InvalidReviewPayload(_)
            | Self::InvalidToolArguments(_)
            | Self::UnknownTool(_)
            | Self::GeocodeFailed(_) => StatusCode::BAD_REQUEST,
            Self::GeodataBackend(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failures of the orchestration chain itself, reported to callers as an
    /// unsuccessful answer rather than an HTTP error.
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            Self::ParameterExtractionFailure(_) | Self::ToolStepsExceeded(_)
        )
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::UnknownTool(name) => Self::UnknownTool(name),
            other @ ToolError::InvalidArguments { .. } => {
                Self::InvalidToolArguments(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[http] {} {}", status.as_u16(), self);
        } else {
            tracing::warn!("[http] {} {}", status.as_u16(), self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Convert AppError to a plain message
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
