//! Test fixtures for root credentials.

use chrono::{DateTime, Duration, Utc};

/// Secret of the seeded root token.
pub const ROOT_SECRET: &str = "root-token-secret-value";

/// Base address used by broker tests.
pub const TEST_BASE_URL: &str = "https://buddy.test";

/// Scopes of a root token able to rotate itself.
pub const MANAGE_SCOPES: &[&str] = &["TOKEN_MANAGE", "WORKSPACE"];

/// Scopes of a root token that cannot manage tokens.
pub const READ_ONLY_SCOPES: &[&str] = &["WORKSPACE", "USER_INFO"];

/// Instant `days` days from now.
#[must_use]
pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Instant `days` days ago.
#[must_use]
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_instants() {
        assert!(days_from_now(1) > Utc::now());
        assert!(days_ago(1) < Utc::now());
    }
}
