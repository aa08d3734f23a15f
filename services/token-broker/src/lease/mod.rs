//! Dynamic token leases.
//!
//! Each issued token is tracked by the host as a lease. The broker hands
//! the host an opaque bookkeeping record and reads it back on renewal and
//! revocation.

pub mod issuer;

pub use issuer::TokenIssuer;

use crate::error::{BrokerError, BrokerResult};
use crate::roles::Role;
use secrecy::SecretString;
use serde_json::Value;
use std::time::Duration;

/// Lease bounds taken from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaseTerms {
    /// Lease duration; zero defers to the host default
    pub ttl: Duration,
    /// Upper bound on total lease lifetime; zero means unbounded
    pub max_ttl: Duration,
}

impl From<&Role> for LeaseTerms {
    fn from(role: &Role) -> Self {
        Self {
            ttl: role.ttl,
            max_ttl: role.max_ttl,
        }
    }
}

/// A newly issued upstream token and its lease.
#[derive(Debug)]
pub struct IssuedToken {
    /// Secret value handed to the caller
    pub token: SecretString,
    /// Lease bounds
    pub lease: LeaseTerms,
    /// Bookkeeping the host stores with the lease
    pub internal_data: Value,
}

/// Read a string field from lease bookkeeping.
///
/// # Errors
///
/// Returns an internal error if the field is missing or not a string.
pub fn internal_field<'a>(data: &'a Value, field: &str) -> BrokerResult<&'a str> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| BrokerError::internal(format!("internal data '{field}' not found")))
}
