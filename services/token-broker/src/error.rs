//! Broker error taxonomy.
//!
//! Every operation returns [`BrokerError`]. Each variant maps to a stable
//! code the dispatch layer can translate into a response.

use crate::storage::StorageError;
use buddy_client::UpstreamError;
use thiserror::Error;

/// Errors surfaced by broker operations.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Malformed or policy-violating input; nothing was changed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The upstream rejected the credential, or it lacks required scopes
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Unknown role or other missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// No usable root credential has been configured
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Upstream API call failed
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Persistent storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored entry could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Broken internal invariant
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Code for rejected input.
pub const VALIDATION: &str = "VALIDATION";
/// Code for a rejected or under-scoped credential.
pub const AUTHENTICATION: &str = "AUTHENTICATION";
/// Code for a missing resource.
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Code for a missing root credential.
pub const NOT_CONFIGURED: &str = "NOT_CONFIGURED";
/// Code for upstream API failures.
pub const UPSTREAM: &str = "UPSTREAM";
/// Code for storage failures.
pub const STORAGE: &str = "STORAGE";
/// Code for broken internal state.
pub const INTERNAL: &str = "INTERNAL";

impl BrokerError {
    /// Check if the failed operation may succeed when retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.is_retryable(),
            Self::Storage(_) => true,
            _ => false,
        }
    }

    /// Stable error code for the dispatch layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => VALIDATION,
            Self::Authentication(_) => AUTHENTICATION,
            Self::NotFound(_) => NOT_FOUND,
            Self::NotConfigured(_) => NOT_CONFIGURED,
            Self::Upstream(_) => UPSTREAM,
            Self::Storage(_) => STORAGE,
            Self::Serialization(_) | Self::Internal(_) => INTERNAL,
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error returned when an operation needs the root credential.
    #[must_use]
    pub fn not_configured() -> Self {
        Self::NotConfigured("root token not provided through config".to_string())
    }
}
