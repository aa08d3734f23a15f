//! Root credential rotation.
//!
//! A stored credential is in one of the states of [`RotationState`]. The
//! periodic hook evaluates the state and either does nothing, disables
//! rotation for an expired token, or rotates. Rotation itself is shared
//! with the manual trigger.

pub mod rotator;
pub mod schedule;

pub use rotator::{RootRotator, RotationOutcome};

use crate::credential::RootCredential;
use chrono::{DateTime, Utc};

/// Rotation state of a stored credential at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// Automatic rotation is off
    Disabled,
    /// The root token expired before it could be rotated
    Expired,
    /// Waiting for the scheduled instant
    Scheduled(DateTime<Utc>),
    /// Rotation should run now
    Due,
}

impl RotationState {
    /// Evaluate `credential` at `now`. `force` makes any enabled,
    /// unexpired credential due.
    #[must_use]
    pub fn evaluate(credential: &RootCredential, now: DateTime<Utc>, force: bool) -> Self {
        if !credential.auto_rotate {
            return Self::Disabled;
        }
        if credential.is_expired(now) {
            return Self::Expired;
        }
        match credential.auto_rotate_at {
            Some(at) if !force && now < at => Self::Scheduled(at),
            _ => Self::Due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(rotate_in: Duration, expires_in: Option<Duration>) -> RootCredential {
        let now = Utc::now();
        let mut credential = RootCredential::new("secret", "https://api.buddy.works");
        credential.auto_rotate = true;
        credential.auto_rotate_at = Some(now + rotate_in);
        credential.expires_at = expires_in.map(|d| now + d);
        credential.no_expiration = expires_in.is_none();
        credential
    }

    #[test]
    fn test_disabled_wins() {
        let mut c = credential(Duration::hours(-1), Some(Duration::hours(-1)));
        c.auto_rotate = false;
        assert_eq!(RotationState::evaluate(&c, Utc::now(), true), RotationState::Disabled);
    }

    #[test]
    fn test_expired_before_due() {
        let c = credential(Duration::hours(-2), Some(Duration::hours(-1)));
        assert_eq!(RotationState::evaluate(&c, Utc::now(), false), RotationState::Expired);
    }

    #[test]
    fn test_scheduled_and_due() {
        let c = credential(Duration::days(3), Some(Duration::days(4)));
        assert!(matches!(
            RotationState::evaluate(&c, Utc::now(), false),
            RotationState::Scheduled(_)
        ));
        assert_eq!(RotationState::evaluate(&c, Utc::now(), true), RotationState::Due);

        let c = credential(Duration::minutes(-1), None);
        assert_eq!(RotationState::evaluate(&c, Utc::now(), false), RotationState::Due);
    }
}
