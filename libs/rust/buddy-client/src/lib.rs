//! Buddy API client for the token broker.
//!
//! Provides the upstream token capability (fetch self, create, delete)
//! behind the [`TokenService`] trait, and a [`Connector`] that builds
//! authenticated handles from a [`ClientConfig`].

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;

pub use client::{BuddyClient, HttpConnector};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{UpstreamError, UpstreamResult};
pub use provider::{
    Connector, MintedToken, TOKEN_MANAGE_SCOPE, TokenIdentity, TokenRequest, TokenService,
};
