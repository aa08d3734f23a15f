//! Mock implementations for testing.
//!
//! [`MockUpstream`] plays the Buddy API: it holds every live token, counts
//! calls, and can be told to fail. [`MockTokenService`] is a handle on it
//! authenticated with one secret, and [`MockConnector`] hands those out
//! while counting how many were built.

use async_trait::async_trait;
use buddy_client::{
    ClientConfig, Connector, MintedToken, TokenIdentity, TokenRequest, TokenService,
    UpstreamError, UpstreamResult,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredToken {
    identity: TokenIdentity,
    secret: String,
}

#[derive(Debug, Default)]
struct UpstreamState {
    tokens: HashMap<String, StoredToken>,
    fetch_calls: usize,
    create_calls: Vec<TokenRequest>,
    delete_calls: Vec<String>,
    fail_fetch: bool,
    fail_create: bool,
    fail_delete: bool,
    mint_without_expiry: bool,
}

/// In-memory stand-in for the Buddy tokens API.
#[derive(Debug, Default)]
pub struct MockUpstream {
    state: RwLock<UpstreamState>,
}

impl MockUpstream {
    /// Create an empty upstream.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an existing token and return its identifier.
    pub async fn seed_token(
        &self,
        secret: &str,
        scopes: &[&str],
        expires_at: Option<DateTime<Utc>>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let identity = TokenIdentity {
            id: id.clone(),
            name: "seeded token".to_string(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            ip_restrictions: Vec::new(),
            workspace_restrictions: Vec::new(),
            expires_at,
        };
        self.state.write().await.tokens.insert(
            id.clone(),
            StoredToken {
                identity,
                secret: secret.to_string(),
            },
        );
        id
    }

    /// Open a handle authenticated with `secret`.
    #[must_use]
    pub fn handle(self: &Arc<Self>, secret: &str) -> MockTokenService {
        MockTokenService {
            upstream: Arc::clone(self),
            secret: secret.to_string(),
        }
    }

    /// Check whether a token is still live.
    pub async fn token_exists(&self, id: &str) -> bool {
        self.state.read().await.tokens.contains_key(id)
    }

    /// Identity of a live token.
    pub async fn identity(&self, id: &str) -> Option<TokenIdentity> {
        self.state
            .read()
            .await
            .tokens
            .get(id)
            .map(|t| t.identity.clone())
    }

    /// Identifier of the live token holding `secret`.
    pub async fn id_for_secret(&self, secret: &str) -> Option<String> {
        self.state
            .read()
            .await
            .tokens
            .values()
            .find(|t| t.secret == secret)
            .map(|t| t.identity.id.clone())
    }

    /// Number of live tokens.
    pub async fn live_tokens(&self) -> usize {
        self.state.read().await.tokens.len()
    }

    /// Number of `fetch_self` calls.
    pub async fn fetch_calls(&self) -> usize {
        self.state.read().await.fetch_calls
    }

    /// Requests received by `create_token`, in order.
    pub async fn create_calls(&self) -> Vec<TokenRequest> {
        self.state.read().await.create_calls.clone()
    }

    /// Identifiers received by `delete_token`, in order.
    pub async fn delete_calls(&self) -> Vec<String> {
        self.state.read().await.delete_calls.clone()
    }

    /// Total number of API calls of any kind.
    pub async fn total_calls(&self) -> usize {
        let state = self.state.read().await;
        state.fetch_calls + state.create_calls.len() + state.delete_calls.len()
    }

    /// Make `fetch_self` fail with a transient error.
    pub async fn set_fail_fetch(&self, fail: bool) {
        self.state.write().await.fail_fetch = fail;
    }

    /// Make `create_token` fail with a transient error.
    pub async fn set_fail_create(&self, fail: bool) {
        self.state.write().await.fail_create = fail;
    }

    /// Make `delete_token` fail with a transient error.
    pub async fn set_fail_delete(&self, fail: bool) {
        self.state.write().await.fail_delete = fail;
    }

    /// Mint tokens that never expire, ignoring the requested lifetime.
    pub async fn set_mint_without_expiry(&self, enabled: bool) {
        self.state.write().await.mint_without_expiry = enabled;
    }
}

fn injected() -> UpstreamError {
    UpstreamError::unavailable("injected failure")
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect()
}

/// Handle on a [`MockUpstream`] authenticated with one secret.
#[derive(Debug, Clone)]
pub struct MockTokenService {
    upstream: Arc<MockUpstream>,
    secret: String,
}

impl MockTokenService {
    fn authenticate(&self, state: &UpstreamState) -> UpstreamResult<TokenIdentity> {
        state
            .tokens
            .values()
            .find(|t| t.secret == self.secret)
            .map(|t| t.identity.clone())
            .ok_or_else(|| UpstreamError::auth_failed("unknown token"))
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn fetch_self(&self) -> UpstreamResult<TokenIdentity> {
        let mut state = self.upstream.state.write().await;
        state.fetch_calls += 1;
        if state.fail_fetch {
            return Err(injected());
        }
        self.authenticate(&state)
    }

    async fn create_token(&self, request: &TokenRequest) -> UpstreamResult<MintedToken> {
        let mut state = self.upstream.state.write().await;
        state.create_calls.push(request.clone());
        if state.fail_create {
            return Err(injected());
        }
        self.authenticate(&state)?;

        let identity = TokenIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            scopes: request.scopes.clone(),
            ip_restrictions: request.ip_restrictions.clone(),
            workspace_restrictions: request.workspace_restrictions.clone(),
            expires_at: (!state.mint_without_expiry)
                .then(|| Utc::now() + ChronoDuration::days(i64::from(request.expires_in_days))),
        };
        let secret = random_secret();
        state.tokens.insert(
            identity.id.clone(),
            StoredToken {
                identity: identity.clone(),
                secret: secret.clone(),
            },
        );

        Ok(MintedToken {
            identity,
            secret: SecretString::from(secret),
        })
    }

    async fn delete_token(&self, id: &str) -> UpstreamResult<()> {
        let mut state = self.upstream.state.write().await;
        state.delete_calls.push(id.to_string());
        if state.fail_delete {
            return Err(injected());
        }
        self.authenticate(&state)?;
        state
            .tokens
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| UpstreamError::not_found(format!("user/tokens/{id}")))
    }
}

/// Connector that counts constructions and can be slowed down or failed.
#[derive(Debug)]
pub struct MockConnector {
    upstream: Arc<MockUpstream>,
    connects: AtomicUsize,
    fail: AtomicBool,
    delay: Duration,
    last_target: std::sync::Mutex<Option<(String, bool)>>,
}

impl MockConnector {
    /// Create a connector over `upstream`.
    #[must_use]
    pub fn new(upstream: Arc<MockUpstream>) -> Self {
        Self {
            upstream,
            connects: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
            last_target: std::sync::Mutex::new(None),
        }
    }

    /// Sleep this long inside every `connect`.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of handles built so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make subsequent connects fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Base address and insecure flag of the most recent connect.
    #[must_use]
    pub fn last_target(&self) -> Option<(String, bool)> {
        self.last_target.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ClientConfig) -> UpstreamResult<Arc<dyn TokenService>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::unavailable("connect refused"));
        }
        if let Ok(mut guard) = self.last_target.lock() {
            *guard = Some((config.base_url.clone(), config.insecure));
        }
        Ok(Arc::new(self.upstream.handle(config.token.expose_secret())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_token_authenticates() {
        let upstream = MockUpstream::new();
        let id = upstream.seed_token("root", &["TOKEN_MANAGE"], None).await;

        let identity = upstream.handle("root").fetch_self().await.unwrap();
        assert_eq!(identity.id, id);
        assert!(upstream.handle("other").fetch_self().await.is_err());
        assert_eq!(upstream.fetch_calls().await, 2);
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let upstream = MockUpstream::new();
        upstream.seed_token("root", &["TOKEN_MANAGE"], None).await;
        let handle = upstream.handle("root");

        let request = TokenRequest {
            name: "t".to_string(),
            expires_in_days: 10,
            scopes: vec!["WORKSPACE".to_string()],
            ip_restrictions: Vec::new(),
            workspace_restrictions: Vec::new(),
        };
        let minted = handle.create_token(&request).await.unwrap();
        assert!(upstream.token_exists(&minted.identity.id).await);
        assert_eq!(upstream.live_tokens().await, 2);

        handle.delete_token(&minted.identity.id).await.unwrap();
        assert!(!upstream.token_exists(&minted.identity.id).await);
        assert!(matches!(
            handle.delete_token(&minted.identity.id).await,
            Err(UpstreamError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mint_without_expiry() {
        let upstream = MockUpstream::new();
        upstream.seed_token("root", &["TOKEN_MANAGE"], None).await;
        upstream.set_mint_without_expiry(true).await;

        let request = TokenRequest {
            name: "t".to_string(),
            expires_in_days: 10,
            scopes: Vec::new(),
            ip_restrictions: Vec::new(),
            workspace_restrictions: Vec::new(),
        };
        let minted = upstream.handle("root").create_token(&request).await.unwrap();
        assert!(minted.identity.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let upstream = MockUpstream::new();
        upstream.seed_token("root", &["TOKEN_MANAGE"], None).await;
        upstream.set_fail_fetch(true).await;

        let err = upstream.handle("root").fetch_self().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_connector_counts() {
        let upstream = MockUpstream::new();
        let connector = MockConnector::new(Arc::clone(&upstream));
        let config = ClientConfig::new("https://buddy.test", SecretString::from("root"));

        connector.connect(&config).await.unwrap();
        connector.connect(&config).await.unwrap();
        assert_eq!(connector.connects(), 2);
        assert_eq!(
            connector.last_target(),
            Some(("https://buddy.test".to_string(), false))
        );

        connector.set_fail(true);
        assert!(connector.connect(&config).await.is_err());
    }
}
