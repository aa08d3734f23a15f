//! Shared test utilities for the token broker workspace.
//!
//! This crate provides:
//! - An in-memory Buddy API double with call counting and failure injection
//! - A counting [`buddy_client::Connector`] for session-cache tests
//! - Proptest generators for role and token policy inputs
//! - Fixtures for root credentials

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{MockConnector, MockTokenService, MockUpstream};
