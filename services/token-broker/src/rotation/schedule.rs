//! Rotation instant arithmetic.
//!
//! All functions take `now` explicitly so schedules are reproducible.

use crate::config::MIN_ROOT_TOKEN_TTL_DAYS;
use crate::error::{BrokerError, BrokerResult};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Move `instant` by a signed number of days.
///
/// # Errors
///
/// Returns a validation error if the result is out of range.
pub fn shift_days(instant: DateTime<Utc>, days: i64) -> BrokerResult<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| BrokerError::validation(format!("{days} days is out of range")))
}

/// First rotation instant for a freshly configured root token.
///
/// Rotation is planned one day before the rotation period ends. If the
/// token expires earlier, rotation moves to one day before expiry, which
/// must still leave the minimum lifetime from `now`.
///
/// # Errors
///
/// Returns a validation error if the token expires too soon.
pub fn initial_rotation(
    now: DateTime<Utc>,
    ttl_in_days: i64,
    expires_at: Option<DateTime<Utc>>,
) -> BrokerResult<DateTime<Utc>> {
    let planned = shift_days(now, ttl_in_days.saturating_sub(1))?;
    let Some(expires_at) = expires_at.filter(|at| *at < planned) else {
        return Ok(planned);
    };

    let before_expiry = shift_days(expires_at, -1)?;
    let earliest = shift_days(now, MIN_ROOT_TOKEN_TTL_DAYS)?;
    if before_expiry < earliest {
        return Err(BrokerError::validation(format!(
            "token expiration date must be after {}, instead it expires at: {}",
            earliest.to_rfc3339(),
            expires_at.to_rfc3339()
        )));
    }
    Ok(before_expiry)
}

/// Next rotation instant after a successful rotation.
///
/// Tokens without an expiration fall back to the rotation period.
///
/// # Errors
///
/// Returns a validation error if the result is out of range.
pub fn next_rotation(
    now: DateTime<Utc>,
    ttl_in_days: i64,
    expires_at: Option<DateTime<Utc>>,
) -> BrokerResult<DateTime<Utc>> {
    match expires_at {
        Some(at) => shift_days(at, -1),
        None => shift_days(now, ttl_in_days.saturating_sub(1)),
    }
}

/// Rotation instant to retry at after a failed periodic attempt.
#[must_use]
pub fn retry_after_failure(
    scheduled: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    backoff: Duration,
) -> DateTime<Utc> {
    let base = scheduled.unwrap_or(now);
    TimeDelta::from_std(backoff)
        .ok()
        .and_then(|delta| base.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
