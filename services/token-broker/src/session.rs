//! Cached upstream session.
//!
//! Holds at most one authenticated handle on the Buddy API. Readers share
//! a valid handle under the read lock; on a miss the write lock is taken
//! and validity re-checked before a new handle is built, so concurrent
//! callers racing on an empty cache trigger a single construction.

use crate::credential::RootCredential;
use crate::error::BrokerResult;
use crate::metrics;
use buddy_client::{Connector, TokenService};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// An authenticated upstream handle with a fixed expiry.
#[derive(Clone)]
pub struct Session {
    service: Arc<dyn TokenService>,
    expires_at: Instant,
}

impl Session {
    /// Wrap a handle that stays valid for `lifetime`.
    #[must_use]
    pub fn new(service: Arc<dyn TokenService>, lifetime: Duration) -> Self {
        Self {
            service,
            expires_at: Instant::now() + lifetime,
        }
    }

    /// A session is valid strictly before its expiry.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }

    /// The underlying token service.
    #[must_use]
    pub fn service(&self) -> &dyn TokenService {
        self.service.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Lazily built, time-boxed upstream session shared by all operations.
pub struct SessionCache {
    connector: Arc<dyn Connector>,
    lifetime: Duration,
    upstream_timeout: Duration,
    current: RwLock<Option<Session>>,
}

impl SessionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, lifetime: Duration, upstream_timeout: Duration) -> Self {
        Self {
            connector,
            lifetime,
            upstream_timeout,
            current: RwLock::new(None),
        }
    }

    /// Return a valid session, building one from the credential produced by
    /// `load` when the cache is empty or expired.
    ///
    /// `load` is only awaited on a miss. A failed build leaves the cache
    /// empty.
    ///
    /// # Errors
    ///
    /// Propagates errors from `load` and from the connector.
    pub async fn acquire<F, Fut>(&self, load: F) -> BrokerResult<Session>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = BrokerResult<RootCredential>> + Send,
    {
        {
            let current = self.current.read().await;
            if let Some(session) = current.as_ref().filter(|s| s.is_valid()) {
                return Ok(session.clone());
            }
        }

        let mut current = self.current.write().await;
        // Another caller may have rebuilt the session while we waited.
        if let Some(session) = current.as_ref().filter(|s| s.is_valid()) {
            return Ok(session.clone());
        }
        *current = None;

        let credential = load().await?;
        let service = match self.connect(&credential).await {
            Ok(service) => service,
            Err(e) => {
                metrics::record_upstream_session("failure");
                return Err(e);
            }
        };

        let session = Session::new(service, self.lifetime);
        *current = Some(session.clone());
        metrics::record_upstream_session("created");
        info!(lifetime_secs = self.lifetime.as_secs(), "Opened upstream session");
        Ok(session)
    }

    /// Build an uncached handle for `credential`.
    ///
    /// Used where a specific credential must be exercised, such as
    /// validating a candidate configuration or rotating.
    ///
    /// # Errors
    ///
    /// Returns an error if the connector fails.
    pub async fn connect(&self, credential: &RootCredential) -> BrokerResult<Arc<dyn TokenService>> {
        let config = credential.client_config().with_timeout(self.upstream_timeout);
        Ok(self.connector.connect(&config).await?)
    }

    /// Drop the cached session unconditionally.
    pub async fn invalidate(&self) {
        let mut current = self.current.write().await;
        if current.take().is_some() {
            debug!("Invalidated upstream session");
        }
    }

    /// Check whether a valid session is cached.
    pub async fn is_cached(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(Session::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use test_utils::fixtures::{MANAGE_SCOPES, ROOT_SECRET, TEST_BASE_URL};
    use test_utils::{MockConnector, MockUpstream};

    fn credential() -> RootCredential {
        RootCredential::new(ROOT_SECRET, TEST_BASE_URL)
    }

    fn cache(connector: Arc<MockConnector>, lifetime: Duration) -> SessionCache {
        SessionCache::new(connector, lifetime, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn reuses_valid_session() {
        let upstream = MockUpstream::new();
        upstream.seed_token(ROOT_SECRET, MANAGE_SCOPES, None).await;
        let connector = Arc::new(MockConnector::new(upstream));
        let cache = cache(Arc::clone(&connector), Duration::from_secs(60));

        cache.acquire(|| async { Ok(credential()) }).await.unwrap();
        cache.acquire(|| async { Ok(credential()) }).await.unwrap();

        assert_eq!(connector.connects(), 1);
        assert!(cache.is_cached().await);
    }

    #[tokio::test]
    async fn expired_session_is_rebuilt() {
        let upstream = MockUpstream::new();
        let connector = Arc::new(MockConnector::new(upstream));
        let cache = cache(Arc::clone(&connector), Duration::ZERO);

        cache.acquire(|| async { Ok(credential()) }).await.unwrap();
        cache.acquire(|| async { Ok(credential()) }).await.unwrap();

        assert_eq!(connector.connects(), 2);
        assert!(!cache.is_cached().await);
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let upstream = MockUpstream::new();
        let connector = Arc::new(MockConnector::new(upstream));
        let cache = cache(Arc::clone(&connector), Duration::from_secs(60));

        cache.acquire(|| async { Ok(credential()) }).await.unwrap();
        cache.invalidate().await;
        assert!(!cache.is_cached().await);

        cache.acquire(|| async { Ok(credential()) }).await.unwrap();
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn failed_build_caches_nothing() {
        let upstream = MockUpstream::new();
        let connector = Arc::new(MockConnector::new(upstream));
        connector.set_fail(true);
        let cache = cache(Arc::clone(&connector), Duration::from_secs(60));

        let result = cache.acquire(|| async { Ok(credential()) }).await;
        assert!(matches!(result, Err(BrokerError::Upstream(_))));
        assert!(!cache.is_cached().await);

        connector.set_fail(false);
        cache.acquire(|| async { Ok(credential()) }).await.unwrap();
        assert!(cache.is_cached().await);
    }

    #[tokio::test]
    async fn loader_error_is_surfaced() {
        let upstream = MockUpstream::new();
        let connector = Arc::new(MockConnector::new(upstream));
        let cache = cache(Arc::clone(&connector), Duration::from_secs(60));

        let result = cache
            .acquire(|| async { Err(BrokerError::not_configured()) })
            .await;

        assert!(matches!(result, Err(BrokerError::NotConfigured(_))));
        assert_eq!(connector.connects(), 0);
    }
}
