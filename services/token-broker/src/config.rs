//! Centralized configuration for the token broker.
//!
//! Operational settings are loaded from environment variables (and an
//! optional `.env` file) and validated once at construction time.

use crate::error::{BrokerError, BrokerResult};
use buddy_client::DEFAULT_BASE_URL;
use std::env;
use std::time::Duration;

/// Rotation period applied when none (or a non-positive one) is configured.
pub const DEFAULT_ROOT_TOKEN_TTL_DAYS: i64 = 30;

/// Shortest allowed rotation period, and the minimum remaining lifetime a
/// root token needs before a rotation can be scheduled.
pub const MIN_ROOT_TOKEN_TTL_DAYS: i64 = 2;

/// Token broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// How long a cached upstream session stays usable
    pub session_lifetime: Duration,
    /// Delay added to the next rotation after a failed periodic attempt
    pub rotation_retry_backoff: Duration,
    /// Upstream lifetime of dynamically issued tokens; leases govern revocation
    pub issued_token_expiration_days: u32,
    /// Rotate on every periodic tick regardless of schedule
    pub force_rotate: bool,
    /// Base address used when the credential does not set one
    pub default_base_url: String,
    /// Timeout for upstream requests
    pub upstream_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            session_lifetime: Duration::from_secs(30 * 60),
            rotation_retry_backoff: Duration::from_secs(60 * 60),
            issued_token_expiration_days: 3650,
            force_rotate: false,
            default_base_url: DEFAULT_BASE_URL.to_string(),
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> BrokerResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let session_lifetime = Duration::from_secs(parse_env(
            "SESSION_LIFETIME_SECS",
            defaults.session_lifetime.as_secs(),
        )?);
        let rotation_retry_backoff = Duration::from_secs(parse_env(
            "ROTATION_RETRY_BACKOFF_SECS",
            defaults.rotation_retry_backoff.as_secs(),
        )?);
        let issued_token_expiration_days = parse_env(
            "ISSUED_TOKEN_EXPIRATION_DAYS",
            defaults.issued_token_expiration_days,
        )?;
        let force_rotate = parse_env("BUDDY_FORCE_ROTATE", defaults.force_rotate)?;
        let default_base_url =
            env::var("BUDDY_DEFAULT_BASE_URL").unwrap_or(defaults.default_base_url);
        let upstream_timeout = Duration::from_secs(parse_env(
            "UPSTREAM_TIMEOUT_SECS",
            defaults.upstream_timeout.as_secs(),
        )?);

        let config = Self {
            session_lifetime,
            rotation_retry_backoff,
            issued_token_expiration_days,
            force_rotate,
            default_base_url,
            upstream_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable forced rotation.
    #[must_use]
    pub const fn with_force_rotate(mut self, force: bool) -> Self {
        self.force_rotate = force;
        self
    }

    /// Set the session lifetime.
    #[must_use]
    pub const fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    fn validate(&self) -> BrokerResult<()> {
        if self.session_lifetime.is_zero() {
            return Err(BrokerError::validation("SESSION_LIFETIME_SECS must be positive"));
        }
        if self.rotation_retry_backoff.is_zero() {
            return Err(BrokerError::validation(
                "ROTATION_RETRY_BACKOFF_SECS must be positive",
            ));
        }
        if self.issued_token_expiration_days == 0 {
            return Err(BrokerError::validation(
                "ISSUED_TOKEN_EXPIRATION_DAYS must be positive",
            ));
        }
        Ok(())
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> BrokerResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| BrokerError::validation(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
