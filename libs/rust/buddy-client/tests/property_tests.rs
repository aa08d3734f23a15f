//! Property-based tests for the Buddy client types.
//!
//! Tests validate:
//! - Token secrets never appear in Debug output
//! - Base address normalization

use buddy_client::{ClientConfig, MintedToken, TokenIdentity};
use proptest::prelude::*;
use secrecy::{ExposeSecret, SecretString};

fn secret_value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{16,64}"
}

fn host_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{2,10}", 1..4).prop_map(|labels| labels.join("."))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A minted token's Debug output shows its identity but never its value.
    #[test]
    fn prop_minted_secret_not_exposed_in_debug(
        secret in secret_value_strategy(),
        id in "[a-f0-9]{8}",
    ) {
        let minted = MintedToken {
            identity: TokenIdentity {
                id: id.clone(),
                name: "vault root token".to_string(),
                scopes: vec!["TOKEN_MANAGE".to_string()],
                ip_restrictions: Vec::new(),
                workspace_restrictions: Vec::new(),
                expires_at: None,
            },
            secret: SecretString::from(secret.clone()),
        };

        let debug = format!("{minted:?}");
        prop_assert!(!debug.contains(&secret));
        prop_assert!(debug.contains(&id));
        prop_assert_eq!(minted.secret.expose_secret(), secret.as_str());
    }

    /// Trailing slashes never survive endpoint normalization.
    #[test]
    fn prop_endpoint_has_no_trailing_slash(
        host in host_strategy(),
        slashes in 0usize..3,
    ) {
        let base = format!("https://{host}{}", "/".repeat(slashes));
        let config = ClientConfig::new(base, SecretString::from("tok"));
        let endpoint = config.endpoint().unwrap();

        prop_assert!(!endpoint.ends_with('/'));
        prop_assert!(endpoint.starts_with("https://"));
    }
}
