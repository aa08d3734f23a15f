//! Shared proptest generators for broker inputs.

use proptest::prelude::*;
use std::time::Duration;

/// Scopes the Buddy API grants to personal access tokens.
pub const KNOWN_SCOPES: &[&str] = &[
    "WORKSPACE",
    "PROJECT_DELETE",
    "REPOSITORY_READ",
    "REPOSITORY_WRITE",
    "EXECUTION_INFO",
    "EXECUTION_RUN",
    "EXECUTION_MANAGE",
    "USER_INFO",
    "MANAGE_EMAILS",
    "WEBHOOK_MANAGE",
    "VARIABLE_ADD",
    "VARIABLE_INFO",
    "VARIABLE_MANAGE",
    "TOKEN_MANAGE",
];

/// Generate role names accepted by the role registry.
pub fn role_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,20}[a-z0-9]"
}

/// Generate a single known scope.
pub fn scope_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(KNOWN_SCOPES).prop_map(ToString::to_string)
}

/// Generate a scope list, possibly with duplicates and in any order.
pub fn scope_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(scope_strategy(), 0..10)
}

/// Generate IPv4 restriction lists, possibly with duplicates.
pub fn ip_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        (1u8..=254, 0u8..=255, 0u8..=255, 1u8..=254)
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
        0..6,
    )
}

/// Generate workspace domain restriction lists, possibly with duplicates.
pub fn workspace_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9-]{2,12}", 0..6)
}

/// Generate lease TTLs up to one week.
pub fn ttl_strategy() -> impl Strategy<Value = Duration> {
    (0u64..=604_800).prop_map(Duration::from_secs)
}

/// Generate root token rotation periods in days, including invalid ones.
pub fn rotation_days_strategy() -> impl Strategy<Value = i64> {
    -5i64..400
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn role_names_are_lowercase(name in role_name_strategy()) {
            prop_assert_eq!(name.to_lowercase(), name);
        }

        #[test]
        fn scopes_are_known(scope in scope_strategy()) {
            prop_assert!(KNOWN_SCOPES.contains(&scope.as_str()));
        }
    }
}
