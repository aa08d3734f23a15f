//! Prometheus metrics for the token broker.
//!
//! Counters are registered in the default registry on first use.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, register_counter_vec};

/// Dynamic tokens issued, by role.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_broker_tokens_issued_total",
        "Total number of dynamic tokens issued",
        &["role"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Lease renewals and revocations.
pub static LEASE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_broker_leases_total",
        "Total number of lease operations",
        &["operation", "status"]
    )
    .expect("Failed to register leases metric")
});

/// Root credential rotations.
pub static ROOT_ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_broker_root_rotations_total",
        "Total number of root credential rotations",
        &["trigger", "status"]
    )
    .expect("Failed to register root_rotations metric")
});

/// Upstream session constructions.
pub static UPSTREAM_SESSIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_broker_upstream_sessions_total",
        "Total number of upstream session constructions",
        &["status"]
    )
    .expect("Failed to register upstream_sessions metric")
});

/// Record a dynamic token issuance.
pub fn record_token_issued(role: &str) {
    TOKENS_ISSUED.with_label_values(&[role]).inc();
}

/// Record a lease renewal or revocation.
pub fn record_lease(operation: &str, status: &str) {
    LEASE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

/// Record a root rotation attempt.
pub fn record_root_rotation(trigger: &str, status: &str) {
    ROOT_ROTATIONS.with_label_values(&[trigger, status]).inc();
}

/// Record an upstream session construction.
pub fn record_upstream_session(status: &str) {
    UPSTREAM_SESSIONS.with_label_values(&[status]).inc();
}
