//! Wire types for the Buddy tokens API.

use crate::provider::TokenIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token representation returned by `user/token` and `user/tokens`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Token identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Secret value, present only in the create response
    #[serde(default)]
    pub token: Option<String>,
    /// Expiration timestamp, RFC 3339
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Granted scopes
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    /// Allowed client addresses
    #[serde(default)]
    pub ip_restrictions: Option<Vec<String>>,
    /// Allowed workspace domains
    #[serde(default)]
    pub workspace_restrictions: Option<Vec<String>>,
}

impl TokenResponse {
    /// Convert to an identity. An absent or unparseable `expires_at`
    /// is reported as "no expiration".
    #[must_use]
    pub fn identity(&self) -> TokenIdentity {
        TokenIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
            scopes: self.scopes.clone().unwrap_or_default(),
            ip_restrictions: self.ip_restrictions.clone().unwrap_or_default(),
            workspace_restrictions: self.workspace_restrictions.clone().unwrap_or_default(),
            expires_at: self.expires_at.as_deref().and_then(parse_expiration),
        }
    }
}

/// Body for `POST user/tokens`.
#[derive(Debug, Serialize)]
pub struct CreateTokenBody<'a> {
    /// Display name
    pub name: &'a str,
    /// Lifetime in days
    pub expires_in: u32,
    /// Scopes to grant
    pub scopes: &'a [String],
    /// Allowed client addresses
    pub ip_restrictions: &'a [String],
    /// Allowed workspace domains
    pub workspace_restrictions: &'a [String],
}

fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_full_response() {
        let raw = serde_json::json!({
            "id": "abc",
            "name": "root",
            "expires_at": "2030-01-02T03:04:05Z",
            "scopes": ["TOKEN_MANAGE"],
            "ip_restrictions": ["10.0.0.1"],
            "workspace_restrictions": ["acme"]
        });
        let response: TokenResponse = serde_json::from_value(raw).unwrap();
        let identity = response.identity();

        assert_eq!(identity.id, "abc");
        assert_eq!(identity.scopes, vec!["TOKEN_MANAGE"]);
        assert_eq!(
            identity.expires_at.unwrap().to_rfc3339(),
            "2030-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn test_identity_without_expiration() {
        let raw = serde_json::json!({ "id": "abc", "expires_at": "" });
        let response: TokenResponse = serde_json::from_value(raw).unwrap();
        let identity = response.identity();

        assert!(identity.expires_at.is_none());
        assert!(identity.scopes.is_empty());
        assert!(identity.workspace_restrictions.is_empty());
    }
}
