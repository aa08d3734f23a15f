//! Buddy client configuration.

use crate::error::{UpstreamError, UpstreamResult};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Public Buddy API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.buddy.works";

/// Connection parameters for one authenticated API handle.
#[derive(Debug)]
pub struct ClientConfig {
    /// API base address
    pub base_url: String,
    /// Personal access token used as bearer credential
    pub token: SecretString,
    /// Skip TLS certificate verification (on-premises installs)
    pub insecure: bool,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for the given endpoint and token.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            token,
            insecure: false,
            timeout: Duration::from_secs(30),
            user_agent: "buddy-token-broker/0.1".to_string(),
        }
    }

    /// Set the insecure flag.
    #[must_use]
    pub const fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Parse the base address, dropping any trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidConfig`] if the address is not an
    /// absolute http(s) URL.
    pub fn endpoint(&self) -> UpstreamResult<String> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::InvalidConfig(format!("base_url: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(UpstreamError::InvalidConfig(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(DEFAULT_BASE_URL, SecretString::from("tok"));
        assert!(!config.insecure);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let config = ClientConfig::new("https://buddy.internal/api/", SecretString::from("tok"));
        assert_eq!(config.endpoint().unwrap(), "https://buddy.internal/api");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        let config = ClientConfig::new("not a url", SecretString::from("tok"));
        assert!(matches!(config.endpoint(), Err(UpstreamError::InvalidConfig(_))));

        let config = ClientConfig::new("ftp://buddy.internal", SecretString::from("tok"));
        assert!(matches!(config.endpoint(), Err(UpstreamError::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new(DEFAULT_BASE_URL, SecretString::from("super-secret"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
