//! Upstream error types using thiserror 2.0.
//!
//! Errors returned by the Buddy API binding, classified by retryability
//! so the broker can decide between surfacing and backing off.

use thiserror::Error;

/// Buddy API errors.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// API unreachable or failing server-side
    #[error("Buddy API unavailable: {0}")]
    Unavailable(String),

    /// Token rejected by the API
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Token lacks permission for the call
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource does not exist (or was already deleted)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited
    #[error("Rate limited")]
    RateLimited,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

impl UpstreamError {
    /// Check if error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::RateLimited | Self::Http(_)
        )
    }

    /// Check if the API rejected the credential itself.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_) | Self::PermissionDenied(_)
        )
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an authentication failed error.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
