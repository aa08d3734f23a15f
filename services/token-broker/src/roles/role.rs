//! Role definition and input normalization.

use crate::error::{BrokerError, BrokerResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

static ROLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w(([\w.-]+)?\w)?$").expect("role name pattern is valid")
});

/// Lowercase `raw` and check it is a valid role name.
///
/// # Errors
///
/// Returns a validation error for names that are empty, start or end
/// with punctuation, or contain characters other than word characters,
/// `.` and `-`.
pub fn normalize_name(raw: &str) -> BrokerResult<String> {
    let name = raw.to_lowercase();
    if ROLE_NAME.is_match(&name) {
        Ok(name)
    } else {
        Err(BrokerError::validation(format!("invalid role name '{raw}'")))
    }
}

/// Trim, drop empties, sort and de-duplicate.
#[must_use]
pub fn normalize_list(values: Vec<String>) -> Vec<String> {
    let mut values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Policy applied to tokens issued for a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    /// Default lease duration; zero defers to the host default
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    /// Maximum lease duration; zero means unbounded
    #[serde(with = "duration_secs")]
    pub max_ttl: Duration,
    /// Scopes granted to issued tokens
    pub scopes: Vec<String>,
    /// IP restrictions of issued tokens
    pub ip_restrictions: Vec<String>,
    /// Workspace restrictions of issued tokens
    pub workspace_restrictions: Vec<String>,
}

/// Fields accepted when writing a role. Unset fields keep their stored
/// values, or their defaults on create.
#[derive(Debug, Clone, Default)]
pub struct RoleRequest {
    /// Lease duration
    pub ttl: Option<Duration>,
    /// Maximum lease duration
    pub max_ttl: Option<Duration>,
    /// Scopes
    pub scopes: Option<Vec<String>>,
    /// IP restrictions
    pub ip_restrictions: Option<Vec<String>>,
    /// Workspace restrictions
    pub workspace_restrictions: Option<Vec<String>>,
}

impl Role {
    /// Apply `request` and enforce the lease bounds.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `ttl` exceeds a non-zero `max_ttl`.
    pub fn apply(&mut self, request: RoleRequest) -> BrokerResult<()> {
        if let Some(ttl) = request.ttl {
            self.ttl = ttl;
        }
        if let Some(max_ttl) = request.max_ttl {
            self.max_ttl = max_ttl;
        }
        if let Some(scopes) = request.scopes {
            self.scopes = scopes;
        }
        if let Some(ips) = request.ip_restrictions {
            self.ip_restrictions = ips;
        }
        if let Some(workspaces) = request.workspace_restrictions {
            self.workspace_restrictions = workspaces;
        }

        if !self.max_ttl.is_zero() && self.ttl > self.max_ttl {
            return Err(BrokerError::validation("ttl cannot be greater than max_ttl"));
        }

        self.scopes = normalize_list(std::mem::take(&mut self.scopes));
        self.ip_restrictions = normalize_list(std::mem::take(&mut self.ip_restrictions));
        self.workspace_restrictions =
            normalize_list(std::mem::take(&mut self.workspace_restrictions));
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
