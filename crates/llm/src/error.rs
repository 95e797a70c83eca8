//! Model call errors.

use thiserror::Error;

/// Longest response body kept in an error message.
const BODY_EXCERPT: usize = 300;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Missing, invalid or unauthorized API key
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Seconds, from the `Retry-After` header when the endpoint sent one.
        retry_after: Option<u64>,
    },

    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("server error ({status}): {message}")]
    ServerError { message: String, status: u16 },

    /// Connection failures, timeouts and client construction errors
    #[error("network error: {message}")]
    NetworkError { message: String },

    /// A 2xx body that is not a chat completion
    #[error("unreadable response: {message}")]
    ParseError { message: String },

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    UnexpectedStatus { message: String, status: u16 },
}

impl LlmError {
    pub fn missing_api_key(provider: &str) -> Self {
        Self::AuthenticationFailed {
            message: format!("no API key configured for {}", provider),
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let message: String = body.chars().take(BODY_EXCERPT).collect();
        match status {
            401 | 403 => Self::AuthenticationFailed { message },
            404 => Self::ModelNotFound { model: message },
            429 => Self::RateLimited {
                message,
                retry_after,
            },
            400 | 422 => Self::InvalidRequest { message },
            500..=599 => Self::ServerError { message, status },
            _ => Self::UnexpectedStatus { message, status },
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::NetworkError {
            message: err.to_string(),
        }
    }

    /// Whether the same request may succeed when sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::NetworkError { .. }
        )
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
