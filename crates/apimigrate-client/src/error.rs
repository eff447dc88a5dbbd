//! Error types for management API operations.

use thiserror::Error;

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced while talking to the management API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be constructed from its configuration.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Authentication was rejected by the management API.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource already exists or conflicts with remote state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The management API is throttling us.
    #[error("Rate limited by the management API")]
    RateLimited {
        /// Seconds to wait, from the Retry-After header if present.
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success response from the management API.
    #[error("Management API returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Transport-level failure (connect, TLS, timeout).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A retryable operation failed on every attempt.
    #[error("{operation} failed after {attempts} attempt(s): {detail}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        detail: String,
    },
}

impl ClientError {
    /// Whether the error is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited { .. } => true,
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }

    /// Whether the error is a server-side (5xx) failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status >= 500)
    }

    /// Whether the error means the resource does not exist remotely.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}
