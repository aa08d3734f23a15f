//! Upstream token capability traits.

use crate::config::ClientConfig;
use crate::error::UpstreamResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::sync::Arc;

/// Scope a token needs to create and delete other tokens.
pub const TOKEN_MANAGE_SCOPE: &str = "TOKEN_MANAGE";

/// Identity and policy of a token as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    /// Upstream token identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Granted scopes
    pub scopes: Vec<String>,
    /// IP addresses the token is restricted to
    pub ip_restrictions: Vec<String>,
    /// Workspace domains the token is restricted to
    pub workspace_restrictions: Vec<String>,
    /// Expiration instant, `None` when the token never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenIdentity {
    /// Check whether the token carries the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Check whether the token may manage other tokens.
    #[must_use]
    pub fn can_manage_tokens(&self) -> bool {
        self.has_scope(TOKEN_MANAGE_SCOPE)
    }
}

/// A freshly created token together with its secret value.
#[derive(Debug)]
pub struct MintedToken {
    /// Identity of the new token
    pub identity: TokenIdentity,
    /// Secret value; only available at creation time
    pub secret: SecretString,
}

/// Parameters for creating a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// Display name
    pub name: String,
    /// Lifetime in days
    pub expires_in_days: u32,
    /// Scopes to grant
    pub scopes: Vec<String>,
    /// IP restrictions
    pub ip_restrictions: Vec<String>,
    /// Workspace restrictions
    pub workspace_restrictions: Vec<String>,
}

/// Token management operations available to an authenticated handle.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Describe the token this handle authenticates with.
    async fn fetch_self(&self) -> UpstreamResult<TokenIdentity>;

    /// Create a new token.
    async fn create_token(&self, request: &TokenRequest) -> UpstreamResult<MintedToken>;

    /// Delete a token by identifier.
    async fn delete_token(&self, id: &str) -> UpstreamResult<()>;
}

/// Builds authenticated [`TokenService`] handles.
///
/// This is the construction path behind every upstream session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a handle authenticated with `config.token`.
    async fn connect(&self, config: &ClientConfig) -> UpstreamResult<Arc<dyn TokenService>>;
}
