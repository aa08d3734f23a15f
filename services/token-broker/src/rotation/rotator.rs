//! Root credential rotator.
//!
//! Rotation mints a replacement root token with the stored policy,
//! persists it, and only then deletes the old token. If the new
//! credential cannot be persisted the replacement is deleted instead, so
//! the stored credential always names a live token.

use super::RotationState;
use super::schedule;
use crate::credential::{CredentialStore, RootCredential};
use crate::error::{BrokerError, BrokerResult};
use crate::metrics;
use buddy_client::{MintedToken, TokenIdentity, TokenRequest};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Name given to rotated root tokens.
pub const ROOT_TOKEN_NAME: &str = "vault root token";

/// What a periodic tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// No credential is stored
    NotConfigured,
    /// Automatic rotation is off
    Disabled,
    /// The root token had expired; automatic rotation was turned off
    ExpiredDisabled,
    /// Not yet due
    NotDue(DateTime<Utc>),
    /// Rotated to a new root token
    Rotated(String),
    /// Rotation failed and was rescheduled
    RetryScheduled(DateTime<Utc>),
}

/// Drives manual and periodic root rotation.
pub struct RootRotator {
    credentials: Arc<CredentialStore>,
    force_rotate: bool,
    retry_backoff: Duration,
}

impl RootRotator {
    /// Create a rotator.
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>, force_rotate: bool, retry_backoff: Duration) -> Self {
        Self {
            credentials,
            force_rotate,
            retry_backoff,
        }
    }

    /// Rotate the root credential now.
    ///
    /// Failures are returned to the caller and nothing is rescheduled.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::NotConfigured`] without a credential, or the
    /// upstream or storage error that aborted the rotation.
    #[instrument(skip(self))]
    pub async fn rotate_root(&self) -> BrokerResult<TokenIdentity> {
        let _guard = self.credentials.lock_writes().await;
        let credential = self.credentials.require().await?;

        match self.rotate(credential).await {
            Ok(identity) => {
                metrics::record_root_rotation("manual", "success");
                Ok(identity)
            }
            Err(e) => {
                metrics::record_root_rotation("manual", "failure");
                Err(e)
            }
        }
    }

    /// Periodic maintenance tick.
    ///
    /// Rotation failures are absorbed by pushing the schedule back by the
    /// retry backoff. Only storage failures reach the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be read or written.
    #[instrument(skip(self))]
    pub async fn periodic(&self) -> BrokerResult<RotationOutcome> {
        let Some(credential) = self.credentials.load().await? else {
            return Ok(RotationOutcome::NotConfigured);
        };
        if !matches!(self.evaluate(&credential), RotationState::Due | RotationState::Expired) {
            return Ok(self.idle_outcome(&credential));
        }

        let _guard = self.credentials.lock_writes().await;
        // A concurrent rotation may have moved the schedule while we waited.
        let Some(mut credential) = self.credentials.load().await? else {
            return Ok(RotationOutcome::NotConfigured);
        };

        match self.evaluate(&credential) {
            RotationState::Expired => {
                warn!(
                    token_id = %credential.token_id,
                    expires_at = ?credential.expires_at,
                    "Root token expired before rotation, disabling auto-rotate"
                );
                credential.auto_rotate = false;
                self.credentials.save(&credential).await?;
                metrics::record_root_rotation("periodic", "disabled");
                Ok(RotationOutcome::ExpiredDisabled)
            }
            RotationState::Due => {
                let scheduled = credential.auto_rotate_at;
                match self.rotate(credential.clone()).await {
                    Ok(identity) => {
                        metrics::record_root_rotation("periodic", "success");
                        Ok(RotationOutcome::Rotated(identity.id))
                    }
                    Err(e) => {
                        metrics::record_root_rotation("periodic", "failure");
                        let retry_at =
                            schedule::retry_after_failure(scheduled, Utc::now(), self.retry_backoff);
                        error!(error = %e, retry_at = %retry_at, "Root rotation failed, rescheduling");
                        credential.auto_rotate_at = Some(retry_at);
                        self.credentials.save(&credential).await?;
                        Ok(RotationOutcome::RetryScheduled(retry_at))
                    }
                }
            }
            RotationState::Disabled | RotationState::Scheduled(_) => {
                Ok(self.idle_outcome(&credential))
            }
        }
    }

    fn evaluate(&self, credential: &RootCredential) -> RotationState {
        RotationState::evaluate(credential, Utc::now(), self.force_rotate)
    }

    fn idle_outcome(&self, credential: &RootCredential) -> RotationOutcome {
        match self.evaluate(credential) {
            RotationState::Scheduled(at) => {
                debug!(rotate_at = %at, "Root rotation not due");
                RotationOutcome::NotDue(at)
            }
            _ => RotationOutcome::Disabled,
        }
    }

    /// Mint, persist, then retire. Caller holds the credential write lock.
    async fn rotate(&self, mut credential: RootCredential) -> BrokerResult<TokenIdentity> {
        let service = self.credentials.sessions().connect(&credential).await?;

        let expires_in_days = u32::try_from(credential.ttl_in_days).map_err(|_| {
            BrokerError::internal(format!(
                "stored ttl of {} days is not a valid token lifetime",
                credential.ttl_in_days
            ))
        })?;
        let request = TokenRequest {
            name: ROOT_TOKEN_NAME.to_string(),
            expires_in_days,
            scopes: credential.scopes.clone(),
            ip_restrictions: credential.ip_restrictions.clone(),
            workspace_restrictions: credential.workspace_restrictions.clone(),
        };
        let minted = service.create_token(&request).await?;
        let old_id = std::mem::take(&mut credential.token_id);

        if let Err(e) = self.persist_minted(&mut credential, &minted).await {
            error!(error = %e, token_id = %minted.identity.id, "Failed to persist rotated root token");
            if let Err(cleanup) = service.delete_token(&minted.identity.id).await {
                error!(
                    error = %cleanup,
                    token_id = %minted.identity.id,
                    "Failed to delete unpersisted root token"
                );
            }
            return Err(e);
        }

        if !old_id.is_empty() && old_id != minted.identity.id {
            if let Err(e) = service.delete_token(&old_id).await {
                warn!(error = %e, token_id = %old_id, "Failed to delete previous root token");
            }
        }

        info!(
            token_id = %minted.identity.id,
            rotate_at = ?credential.auto_rotate_at,
            "Rotated root token"
        );
        Ok(minted.identity)
    }

    async fn persist_minted(
        &self,
        credential: &mut RootCredential,
        minted: &MintedToken,
    ) -> BrokerResult<()> {
        credential.apply_minted(minted);
        credential.auto_rotate_at = Some(schedule::next_rotation(
            Utc::now(),
            credential.ttl_in_days,
            minted.identity.expires_at,
        )?);
        self.credentials.save(credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ConfigureRequest;
    use crate::session::SessionCache;
    use crate::storage::MemoryStorage;
    use test_utils::fixtures::{MANAGE_SCOPES, ROOT_SECRET, TEST_BASE_URL, days_from_now};
    use test_utils::{MockConnector, MockUpstream};

    async fn configured(auto_rotate: bool) -> (Arc<MockUpstream>, Arc<CredentialStore>) {
        let upstream = MockUpstream::new();
        upstream
            .seed_token(ROOT_SECRET, MANAGE_SCOPES, Some(days_from_now(60)))
            .await;
        let connector = Arc::new(MockConnector::new(Arc::clone(&upstream)));
        let sessions = Arc::new(SessionCache::new(
            connector,
            Duration::from_secs(60),
            Duration::from_secs(5),
        ));
        let store = Arc::new(CredentialStore::new(
            Arc::new(MemoryStorage::new()),
            sessions,
            TEST_BASE_URL,
        ));
        store
            .configure(ConfigureRequest::with_token(ROOT_SECRET).auto_rotate(auto_rotate))
            .await
            .unwrap();
        (upstream, store)
    }

    #[tokio::test]
    async fn manual_rotation_replaces_secret() {
        let (upstream, store) = configured(false).await;
        let old = store.require().await.unwrap();
        let rotator = RootRotator::new(Arc::clone(&store), false, Duration::from_secs(3600));

        let identity = rotator.rotate_root().await.unwrap();

        let new = store.require().await.unwrap();
        assert_ne!(new.secret, old.secret);
        assert_eq!(new.token_id, identity.id);
        assert!(!upstream.token_exists(&old.token_id).await);
        assert_eq!(upstream.create_calls().await[0].name, ROOT_TOKEN_NAME);
    }

    #[tokio::test]
    async fn periodic_before_schedule_is_not_due() {
        let (upstream, store) = configured(true).await;
        let rotator = RootRotator::new(store, false, Duration::from_secs(3600));

        let outcome = rotator.periodic().await.unwrap();

        assert!(matches!(outcome, RotationOutcome::NotDue(_)));
        assert!(upstream.create_calls().await.is_empty());
    }

    #[tokio::test]
    async fn forced_periodic_rotates() {
        let (upstream, store) = configured(true).await;
        let rotator = RootRotator::new(store, true, Duration::from_secs(3600));

        let outcome = rotator.periodic().await.unwrap();

        assert!(matches!(outcome, RotationOutcome::Rotated(_)));
        assert_eq!(upstream.create_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn manual_rotation_failure_is_returned() {
        let (upstream, store) = configured(false).await;
        upstream.set_fail_create(true).await;
        let before = store.load().await.unwrap();
        let rotator = RootRotator::new(Arc::clone(&store), false, Duration::from_secs(3600));

        assert!(rotator.rotate_root().await.is_err());
        assert_eq!(store.load().await.unwrap(), before);
    }
}
