//! Error types for source API operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the source API.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure (connection refused, reset, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The requested user does not exist or is suspended.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// The request did not complete within the per-request timeout.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SourceError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, timeouts, rate limits and server-side (5xx) errors are
    /// transient. Client errors and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(_) | SourceError::Timeout { .. } | SourceError::RateLimited { .. } => {
                true
            }
            SourceError::Api { status, .. } => *status >= 500,
            SourceError::Json(_) | SourceError::UserNotFound(_) | SourceError::Config(_) => false,
        }
    }
}

/// Extract a short error message suitable for logs and progress events.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
