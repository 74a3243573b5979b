//! Typed errors for LLM operations
//!
//! Lets callers tell an expired key from a rate limit or an unreachable
//! backend without matching on strings.

use thiserror::Error;

/// LLM operation errors with typed variants
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key rejected (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400), e.g. a schema the backend refuses
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection refused, DNS failure and the like
    #[error("Network error: {0}")]
    Network(String),

    /// Provider could not be constructed (missing key, unknown name)
    #[error("Provider configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            LlmError::Other(e.into())
        }
    }
}
