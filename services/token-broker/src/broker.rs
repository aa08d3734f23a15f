//! Token broker facade.
//!
//! Wires the session cache, credential store, rotator, role registry and
//! issuer over one storage backend and one upstream connector, and
//! exposes the operation surface the host dispatches to.

use crate::config::BrokerConfig;
use crate::credential::{ConfigureRequest, CredentialStore, CredentialView};
use crate::error::BrokerResult;
use crate::lease::{IssuedToken, LeaseTerms, TokenIssuer};
use crate::roles::{Role, RoleRegistry, RoleRequest};
use crate::rotation::{RootRotator, RotationOutcome};
use crate::session::SessionCache;
use crate::storage::Storage;
use buddy_client::{Connector, TokenIdentity};
use serde_json::Value;
use std::sync::Arc;

/// Credential-lifecycle engine for the Buddy tokens API.
pub struct TokenBroker {
    credentials: Arc<CredentialStore>,
    rotator: RootRotator,
    roles: Arc<RoleRegistry>,
    issuer: TokenIssuer,
}

impl TokenBroker {
    /// Build a broker over `storage`, connecting through `connector`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, connector: Arc<dyn Connector>, config: &BrokerConfig) -> Self {
        let sessions = Arc::new(SessionCache::new(
            connector,
            config.session_lifetime,
            config.upstream_timeout,
        ));
        let credentials = Arc::new(CredentialStore::new(
            Arc::clone(&storage),
            sessions,
            config.default_base_url.clone(),
        ));
        let roles = Arc::new(RoleRegistry::new(storage));
        let rotator = RootRotator::new(
            Arc::clone(&credentials),
            config.force_rotate,
            config.rotation_retry_backoff,
        );
        let issuer = TokenIssuer::new(
            Arc::clone(&credentials),
            Arc::clone(&roles),
            config.issued_token_expiration_days,
        );

        Self {
            credentials,
            rotator,
            roles,
            issuer,
        }
    }

    /// Validate and store the root credential.
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::configure`].
    pub async fn configure(&self, request: ConfigureRequest) -> BrokerResult<CredentialView> {
        self.credentials.configure(request).await
    }

    /// Read the root credential without its secret.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn read_config(&self) -> BrokerResult<Option<CredentialView>> {
        self.credentials.read().await
    }

    /// Delete the root credential.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn delete_config(&self) -> BrokerResult<()> {
        self.credentials.delete().await
    }

    /// Check whether a root credential is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn config_exists(&self) -> BrokerResult<bool> {
        self.credentials.exists().await
    }

    /// Rotate the root credential now.
    ///
    /// # Errors
    ///
    /// See [`RootRotator::rotate_root`].
    pub async fn rotate_root(&self) -> BrokerResult<TokenIdentity> {
        self.rotator.rotate_root().await
    }

    /// Periodic maintenance hook.
    ///
    /// # Errors
    ///
    /// See [`RootRotator::periodic`].
    pub async fn periodic(&self) -> BrokerResult<RotationOutcome> {
        self.rotator.periodic().await
    }

    /// Create or update a role.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::write`].
    pub async fn write_role(&self, name: &str, request: RoleRequest) -> BrokerResult<Role> {
        self.roles.write(name, request).await
    }

    /// Read a role.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::read`].
    pub async fn read_role(&self, name: &str) -> BrokerResult<Option<Role>> {
        self.roles.read(name).await
    }

    /// Delete a role.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::delete`].
    pub async fn delete_role(&self, name: &str) -> BrokerResult<()> {
        self.roles.delete(name).await
    }

    /// List role names.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list_roles(&self) -> BrokerResult<Vec<String>> {
        self.roles.list().await
    }

    /// Check whether a role exists.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::exists`].
    pub async fn role_exists(&self, name: &str) -> BrokerResult<bool> {
        self.roles.exists(name).await
    }

    /// Issue a token for `role`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`].
    pub async fn issue(&self, role: &str) -> BrokerResult<IssuedToken> {
        self.issuer.issue(role).await
    }

    /// Renew a lease.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::renew`].
    pub async fn renew(&self, internal_data: &Value) -> BrokerResult<Option<LeaseTerms>> {
        self.issuer.renew(internal_data).await
    }

    /// Revoke a lease.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::revoke`].
    pub async fn revoke(&self, internal_data: &Value) -> BrokerResult<()> {
        self.issuer.revoke(internal_data).await
    }
}
