//! Dynamic token issuer.

use super::{IssuedToken, LeaseTerms, internal_field};
use crate::credential::CredentialStore;
use crate::error::{BrokerError, BrokerResult};
use crate::metrics;
use crate::roles::{RoleRegistry, normalize_name};
use buddy_client::TokenRequest;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Issues, renews and revokes role-scoped upstream tokens.
pub struct TokenIssuer {
    credentials: Arc<CredentialStore>,
    roles: Arc<RoleRegistry>,
    expiration_days: u32,
}

impl TokenIssuer {
    /// Create an issuer. Issued tokens get an upstream lifetime of
    /// `expiration_days`; the lease decides when they are revoked.
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        roles: Arc<RoleRegistry>,
        expiration_days: u32,
    ) -> Self {
        Self {
            credentials,
            roles,
            expiration_days,
        }
    }

    /// Mint a token with the policy of `role_name`.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::NotConfigured`] without a root credential
    /// - [`BrokerError::NotFound`] for an unknown role
    /// - [`BrokerError::Upstream`] if the upstream call fails
    #[instrument(skip(self))]
    pub async fn issue(&self, role_name: &str) -> BrokerResult<IssuedToken> {
        self.credentials.require().await?;

        let name = normalize_name(role_name)?;
        let role = self
            .roles
            .read(&name)
            .await?
            .ok_or_else(|| BrokerError::not_found(format!("role '{name}' does not exist")))?;

        let session = self.credentials.session().await?;
        let request = TokenRequest {
            name: format!("vault token for '{name}' role"),
            expires_in_days: self.expiration_days,
            scopes: role.scopes.clone(),
            ip_restrictions: role.ip_restrictions.clone(),
            workspace_restrictions: role.workspace_restrictions.clone(),
        };
        let minted = session.service().create_token(&request).await?;

        metrics::record_token_issued(&name);
        info!(role = %name, token_id = %minted.identity.id, "Issued token");

        Ok(IssuedToken {
            token: minted.secret,
            lease: LeaseTerms::from(&role),
            internal_data: json!({
                "role": name,
                "token_id": minted.identity.id,
            }),
        })
    }

    /// Lease terms for renewing the lease described by `internal_data`.
    ///
    /// Terms come from the role as it is now. Returns `None` when the role
    /// has been deleted, which leaves the lease to run out.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the bookkeeping has no role.
    #[instrument(skip(self, internal_data))]
    pub async fn renew(&self, internal_data: &Value) -> BrokerResult<Option<LeaseTerms>> {
        let role_name = internal_field(internal_data, "role")?;
        let terms = self.roles.read(role_name).await?.map(|role| LeaseTerms::from(&role));

        match &terms {
            Some(_) => {
                metrics::record_lease("renew", "success");
                debug!(role = %role_name, "Renewed lease");
            }
            None => {
                metrics::record_lease("renew", "role_missing");
                warn!(role = %role_name, "Role no longer exists, lease not extended");
            }
        }
        Ok(terms)
    }

    /// Delete the upstream token behind a lease.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the bookkeeping has no token id, and
    /// propagates upstream failures so the host can retry.
    #[instrument(skip(self, internal_data))]
    pub async fn revoke(&self, internal_data: &Value) -> BrokerResult<()> {
        let token_id = internal_field(internal_data, "token_id")?;
        let session = self.credentials.session().await?;

        if let Err(e) = session.service().delete_token(token_id).await {
            metrics::record_lease("revoke", "failure");
            warn!(error = %e, token_id = %token_id, "Failed to revoke token");
            return Err(e.into());
        }

        metrics::record_lease("revoke", "success");
        info!(token_id = %token_id, "Revoked token");
        Ok(())
    }
}
