//! Buddy HTTP client with bearer-token authentication.

use crate::{
    config::ClientConfig,
    error::{UpstreamError, UpstreamResult},
    models::{CreateTokenBody, TokenResponse},
    provider::{Connector, MintedToken, TokenIdentity, TokenRequest, TokenService},
};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Authenticated handle on the Buddy API.
pub struct BuddyClient {
    endpoint: String,
    token: SecretString,
    http: Client,
}

impl BuddyClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base address is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> UpstreamResult<Self> {
        let endpoint = config.endpoint()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(config.insecure)
            .use_rustls_tls()
            .build()
            .map_err(UpstreamError::Http)?;

        Ok(Self {
            endpoint,
            token: config.token,
            http,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&CreateTokenBody<'_>>,
    ) -> UpstreamResult<Response> {
        let url = format!("{}/{}", self.endpoint, path);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(self.token.expose_secret());

        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::unavailable(e.to_string()))?;

        check_status(path, response).await
    }
}

async fn check_status(path: &str, response: Response) -> UpstreamResult<Response> {
    let status = response.status();
    match status.as_u16() {
        401 => Err(UpstreamError::auth_failed(format!("Status {status} for {path}"))),
        403 => Err(UpstreamError::PermissionDenied(path.to_string())),
        404 => Err(UpstreamError::not_found(path)),
        429 => Err(UpstreamError::RateLimited),
        _ if !status.is_success() => {
            let text = response.text().await.unwrap_or_default();
            Err(UpstreamError::unavailable(format!("Status {status}: {text}")))
        }
        _ => Ok(response),
    }
}

#[async_trait]
impl TokenService for BuddyClient {
    #[instrument(skip(self))]
    async fn fetch_self(&self) -> UpstreamResult<TokenIdentity> {
        let response: TokenResponse = self.send(Method::GET, "user/token", None).await?.json().await?;
        Ok(response.identity())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create_token(&self, request: &TokenRequest) -> UpstreamResult<MintedToken> {
        let body = CreateTokenBody {
            name: &request.name,
            expires_in: request.expires_in_days,
            scopes: &request.scopes,
            ip_restrictions: &request.ip_restrictions,
            workspace_restrictions: &request.workspace_restrictions,
        };

        let response: TokenResponse = self
            .send(Method::POST, "user/tokens", Some(&body))
            .await?
            .json()
            .await?;

        let identity = response.identity();
        let secret = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UpstreamError::InvalidResponse("created token has no value".to_string()))?;

        debug!(token_id = %identity.id, "Created token");
        Ok(MintedToken {
            identity,
            secret: SecretString::from(secret),
        })
    }

    #[instrument(skip(self))]
    async fn delete_token(&self, id: &str) -> UpstreamResult<()> {
        self.send(Method::DELETE, &format!("user/tokens/{id}"), None)
            .await?;
        Ok(())
    }
}

/// Connector producing one [`BuddyClient`] per connection. Every setting,
/// the request timeout included, comes from the config passed to
/// [`Connector::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl HttpConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, config: &ClientConfig) -> UpstreamResult<Arc<dyn TokenService>> {
        let config = ClientConfig::new(
            config.base_url.clone(),
            SecretString::from(config.token.expose_secret().to_owned()),
        )
        .with_insecure(config.insecure)
        .with_user_agent(config.user_agent.clone())
        .with_timeout(config.timeout);

        Ok(Arc::new(BuddyClient::new(config)?))
    }
}
