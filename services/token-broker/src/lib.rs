//! Token broker library.
//!
//! Manages the lifecycle of Buddy API credentials: a cached upstream
//! session, a validated root credential with scheduled rotation, named
//! roles, and leased dynamic tokens.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod config;
pub mod credential;
pub mod error;
pub mod lease;
pub mod metrics;
pub mod roles;
pub mod rotation;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use broker::TokenBroker;
pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult};
