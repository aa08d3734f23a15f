//! Root credential record and its redacted view.

use buddy_client::{ClientConfig, MintedToken, TokenIdentity};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// The persisted root credential and its rotation policy.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootCredential {
    /// Secret value of the root token
    pub secret: String,
    /// API base address
    pub base_url: String,
    /// Skip TLS verification
    pub insecure: bool,
    /// Rotate automatically from the periodic hook
    pub auto_rotate: bool,
    /// Next scheduled rotation
    pub auto_rotate_at: Option<DateTime<Utc>>,
    /// Lifetime requested for rotated root tokens
    pub ttl_in_days: i64,
    /// Upstream identifier of the root token
    pub token_id: String,
    /// Upstream expiration of the root token
    pub expires_at: Option<DateTime<Utc>>,
    /// The root token never expires
    pub no_expiration: bool,
    /// Scopes reported by the upstream
    pub scopes: Vec<String>,
    /// IP restrictions reported by the upstream
    pub ip_restrictions: Vec<String>,
    /// Workspace restrictions reported by the upstream
    pub workspace_restrictions: Vec<String>,
}

impl Default for RootCredential {
    fn default() -> Self {
        Self {
            secret: String::new(),
            base_url: String::new(),
            insecure: false,
            auto_rotate: false,
            auto_rotate_at: None,
            ttl_in_days: 0,
            token_id: String::new(),
            expires_at: None,
            no_expiration: false,
            scopes: Vec::new(),
            ip_restrictions: Vec::new(),
            workspace_restrictions: Vec::new(),
        }
    }
}

impl RootCredential {
    /// Create a credential with only connection settings filled in.
    #[must_use]
    pub fn new(secret: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Check whether a secret value is present.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Client settings for connecting with this credential.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone(), SecretString::from(self.secret.clone()))
            .with_insecure(self.insecure)
    }

    /// Check whether the root token's own expiration has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.no_expiration && self.expires_at.is_some_and(|at| at < now)
    }

    /// Copy identity and policy fields reported by the upstream.
    pub fn apply_identity(&mut self, identity: &TokenIdentity) {
        self.token_id.clone_from(&identity.id);
        self.expires_at = identity.expires_at;
        self.no_expiration = identity.expires_at.is_none();
        self.scopes.clone_from(&identity.scopes);
        self.ip_restrictions.clone_from(&identity.ip_restrictions);
        self.workspace_restrictions
            .clone_from(&identity.workspace_restrictions);
    }

    /// Replace the secret and identity with a freshly minted token.
    pub fn apply_minted(&mut self, minted: &MintedToken) {
        self.secret = minted.secret.expose_secret().to_owned();
        self.apply_identity(&minted.identity);
    }

    /// Redacted view safe to return to callers.
    #[must_use]
    pub fn view(&self) -> CredentialView {
        let known = !self.token_id.is_empty();
        CredentialView {
            base_url: self.base_url.clone(),
            insecure: self.insecure,
            ttl_in_days: self.ttl_in_days,
            auto_rotate: self.auto_rotate,
            auto_rotate_at: self.auto_rotate_at.filter(|_| self.auto_rotate),
            token_id: known.then(|| self.token_id.clone()),
            token_expires_at: known.then(|| match self.expires_at {
                Some(at) if !self.no_expiration => TokenExpiration::At(at),
                _ => TokenExpiration::Never,
            }),
            token_scopes: known.then(|| self.scopes.clone()),
            token_ip_restrictions: known.then(|| self.ip_restrictions.clone()),
            token_workspace_restrictions: known.then(|| self.workspace_restrictions.clone()),
        }
    }
}

impl std::fmt::Debug for RootCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootCredential")
            .field("secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("insecure", &self.insecure)
            .field("auto_rotate", &self.auto_rotate)
            .field("auto_rotate_at", &self.auto_rotate_at)
            .field("ttl_in_days", &self.ttl_in_days)
            .field("token_id", &self.token_id)
            .field("expires_at", &self.expires_at)
            .field("no_expiration", &self.no_expiration)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

/// Expiration of the root token as shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiration {
    /// Expires at the given instant
    At(DateTime<Utc>),
    /// Never expires
    Never,
}

impl Serialize for TokenExpiration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::At(at) => at.serialize(serializer),
            Self::Never => serializer.serialize_str("no expiration date"),
        }
    }
}

/// Root credential without its secret value. Identity fields are only
/// present once the upstream has reported them.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialView {
    pub base_url: String,
    pub insecure: bool,
    #[serde(rename = "token_ttl_in_days")]
    pub ttl_in_days: i64,
    #[serde(rename = "token_auto_rotate")]
    pub auto_rotate: bool,
    #[serde(rename = "token_auto_rotate_at", skip_serializing_if = "Option::is_none")]
    pub auto_rotate_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<TokenExpiration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_scopes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_ip_restrictions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_workspace_restrictions: Option<Vec<String>>,
}

/// Fields accepted by the configure operation. Unset fields keep their
/// stored values.
#[derive(Debug, Default)]
pub struct ConfigureRequest {
    /// Root token secret
    pub token: Option<SecretString>,
    /// API base address
    pub base_url: Option<String>,
    /// Skip TLS verification
    pub insecure: Option<bool>,
    /// Rotate automatically
    pub auto_rotate: Option<bool>,
    /// Lifetime of rotated root tokens in days
    pub ttl_in_days: Option<i64>,
}

impl ConfigureRequest {
    /// Request setting only the token secret.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
            ..Self::default()
        }
    }

    /// Set the base address.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the insecure flag.
    #[must_use]
    pub const fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = Some(insecure);
        self
    }

    /// Set the auto-rotate flag.
    #[must_use]
    pub const fn auto_rotate(mut self, auto_rotate: bool) -> Self {
        self.auto_rotate = Some(auto_rotate);
        self
    }

    /// Set the rotation period in days.
    #[must_use]
    pub const fn ttl_in_days(mut self, days: i64) -> Self {
        self.ttl_in_days = Some(days);
        self
    }

    /// Merge the set fields onto `credential`.
    pub fn merge_into(self, credential: &mut RootCredential) {
        if let Some(token) = self.token {
            credential.secret = token.expose_secret().to_owned();
        }
        if let Some(base_url) = self.base_url {
            credential.base_url = base_url;
        }
        if let Some(insecure) = self.insecure {
            credential.insecure = insecure;
        }
        if let Some(auto_rotate) = self.auto_rotate {
            credential.auto_rotate = auto_rotate;
        }
        if let Some(days) = self.ttl_in_days {
            credential.ttl_in_days = days;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity(expires_at: Option<DateTime<Utc>>) -> TokenIdentity {
        TokenIdentity {
            id: "root-id".to_string(),
            name: "root".to_string(),
            scopes: vec!["TOKEN_MANAGE".to_string()],
            ip_restrictions: vec!["10.0.0.1".to_string()],
            workspace_restrictions: Vec::new(),
            expires_at,
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = RootCredential::new("very-secret-value", "https://api.buddy.works");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("very-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut credential = RootCredential::new("old", "https://buddy.internal");
        credential.ttl_in_days = 10;

        ConfigureRequest::default().auto_rotate(true).merge_into(&mut credential);

        assert_eq!(credential.secret, "old");
        assert_eq!(credential.base_url, "https://buddy.internal");
        assert_eq!(credential.ttl_in_days, 10);
        assert!(credential.auto_rotate);
    }

    #[test]
    fn test_expiration_checks() {
        let now = Utc::now();
        let mut credential = RootCredential::new("s", "u");
        credential.apply_identity(&identity(Some(now - Duration::hours(1))));
        assert!(credential.is_expired(now));

        credential.apply_identity(&identity(None));
        assert!(credential.no_expiration);
        assert!(!credential.is_expired(now));
    }

    #[test]
    fn test_view_hides_secret_and_reports_never() {
        let mut credential = RootCredential::new("s3cr3t", "https://api.buddy.works");
        credential.apply_identity(&identity(None));

        let view = credential.view();
        assert_eq!(view.token_id.as_deref(), Some("root-id"));
        assert_eq!(view.token_expires_at, Some(TokenExpiration::Never));
        assert!(view.auto_rotate_at.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["token_expires_at"], "no expiration date");
        assert!(!json.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_view_without_identity_omits_token_fields() {
        let view = RootCredential::new("s", "u").view();
        assert!(view.token_id.is_none());
        assert!(view.token_scopes.is_none());
    }
}
