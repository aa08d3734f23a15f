//! Root credential store.
//!
//! Owns the `config` entry. Every successful write or delete drops the
//! cached upstream session before returning, so no caller can observe a
//! session built from a superseded credential. Configure, delete and root
//! rotation hold the write lock for their whole read-modify-write.

use super::model::{ConfigureRequest, CredentialView, RootCredential};
use crate::config::{DEFAULT_ROOT_TOKEN_TTL_DAYS, MIN_ROOT_TOKEN_TTL_DAYS};
use crate::error::{BrokerError, BrokerResult};
use crate::rotation::schedule;
use crate::session::{Session, SessionCache};
use crate::storage::{self, CONFIG_KEY, Storage};
use buddy_client::{TOKEN_MANAGE_SCOPE, UpstreamError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, instrument, warn};

/// Persistence and validation of the root credential.
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    sessions: Arc<SessionCache>,
    default_base_url: String,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store over `storage` sharing `sessions`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        sessions: Arc<SessionCache>,
        default_base_url: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            sessions,
            default_base_url: default_base_url.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Serialize a read-modify-write of the credential against configure,
    /// delete and rotation.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// The session cache this store invalidates.
    #[must_use]
    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    /// Load the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the entry is corrupt.
    pub async fn load(&self) -> BrokerResult<Option<RootCredential>> {
        storage::read_json(self.storage.as_ref(), CONFIG_KEY).await
    }

    /// Load a credential that carries a secret.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotConfigured`] if there is no usable
    /// credential.
    pub async fn require(&self) -> BrokerResult<RootCredential> {
        self.load()
            .await?
            .filter(RootCredential::has_secret)
            .ok_or_else(BrokerError::not_configured)
    }

    /// Persist `credential` and drop the cached session.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; the cache is left untouched.
    pub async fn save(&self, credential: &RootCredential) -> BrokerResult<()> {
        storage::write_json(self.storage.as_ref(), CONFIG_KEY, credential).await?;
        self.sessions.invalidate().await;
        Ok(())
    }

    /// Return the shared upstream session, building it from the stored
    /// credential on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential is configured or the connection
    /// cannot be built.
    pub async fn session(&self) -> BrokerResult<Session> {
        self.sessions.acquire(|| self.require()).await
    }

    /// Check whether a credential entry exists.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn exists(&self) -> BrokerResult<bool> {
        Ok(self.storage.get(CONFIG_KEY).await?.is_some())
    }

    /// Return the stored credential without its secret.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the entry is corrupt.
    pub async fn read(&self) -> BrokerResult<Option<CredentialView>> {
        Ok(self.load().await?.map(|credential| credential.view()))
    }

    /// Remove the credential and drop the cached session.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[instrument(skip(self))]
    pub async fn delete(&self) -> BrokerResult<()> {
        let _guard = self.lock_writes().await;
        self.storage.delete(CONFIG_KEY).await?;
        self.sessions.invalidate().await;
        info!("Deleted root credential");
        Ok(())
    }

    /// Validate and persist a root credential.
    ///
    /// `request` is merged onto the stored credential. The merged secret
    /// is checked against the upstream with a fresh connection, and the
    /// upstream's view of the token becomes the stored identity. Nothing
    /// is written unless every check passes.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::Validation`] for an empty secret, a rotation period
    ///   below the minimum, or a token expiring too soon to rotate
    /// - [`BrokerError::Authentication`] if the upstream rejects the secret
    ///   or the token lacks `TOKEN_MANAGE`
    /// - [`BrokerError::Upstream`] for transient upstream failures
    #[instrument(skip(self, request))]
    pub async fn configure(&self, request: ConfigureRequest) -> BrokerResult<CredentialView> {
        let _guard = self.lock_writes().await;
        let mut candidate = self.load().await?.unwrap_or_default();
        request.merge_into(&mut candidate);

        if candidate.base_url.trim().is_empty() {
            candidate.base_url.clone_from(&self.default_base_url);
        }
        if candidate.ttl_in_days <= 0 {
            candidate.ttl_in_days = DEFAULT_ROOT_TOKEN_TTL_DAYS;
        }
        if candidate.ttl_in_days < MIN_ROOT_TOKEN_TTL_DAYS {
            return Err(BrokerError::validation(format!(
                "token ttl must be at least {MIN_ROOT_TOKEN_TTL_DAYS} days"
            )));
        }
        if !candidate.has_secret() {
            return Err(BrokerError::validation("token must be provided"));
        }

        let service = self.sessions.connect(&candidate).await.map_err(|e| match e {
            BrokerError::Upstream(UpstreamError::InvalidConfig(msg)) => {
                BrokerError::validation(msg)
            }
            other => other,
        })?;

        let identity = service.fetch_self().await.map_err(|e| {
            if e.is_auth_failure() {
                warn!(error = %e, "Upstream rejected candidate root token");
                BrokerError::authentication("invalid token")
            } else {
                BrokerError::Upstream(e)
            }
        })?;

        candidate.auto_rotate_at = if candidate.auto_rotate {
            Some(schedule::initial_rotation(
                Utc::now(),
                candidate.ttl_in_days,
                identity.expires_at,
            )?)
        } else {
            None
        };
        candidate.apply_identity(&identity);

        if !identity.can_manage_tokens() {
            return Err(BrokerError::authentication(format!(
                "token must have `{TOKEN_MANAGE_SCOPE}` scope"
            )));
        }

        self.save(&candidate).await?;

        info!(
            token_id = %candidate.token_id,
            auto_rotate = candidate.auto_rotate,
            ttl_in_days = candidate.ttl_in_days,
            "Configured root credential"
        );

        Ok(candidate.view())
    }
}
