//! Persistent storage seam.
//!
//! The broker never owns its storage engine. Embedders provide a
//! [`Storage`] with atomic per-key `get`/`put`/`delete` and prefix
//! listing; [`MemoryStorage`] is the in-process implementation.

pub mod memory;

pub use memory::MemoryStorage;

use crate::error::BrokerResult;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Key of the root credential entry.
pub const CONFIG_KEY: &str = "config";

/// Namespace of role entries.
pub const ROLES_PREFIX: &str = "roles/";

/// Storage backend failure.
#[derive(Error, Debug)]
#[error("Storage error: {message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    /// Create a storage error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Durable key-value storage with atomic per-key operations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read an entry.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an entry, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete an entry. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List the immediate children under `prefix`. Nested namespaces are
    /// reported once, with a trailing `/`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Read and decode a JSON entry.
///
/// # Errors
///
/// Returns an error if the backend fails or the entry cannot be decoded.
pub async fn read_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> BrokerResult<Option<T>> {
    match storage.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON entry.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded or the backend fails.
pub async fn write_json<T: Serialize + Sync>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> BrokerResult<()> {
    let raw = serde_json::to_vec(value)?;
    storage.put(key, &raw).await?;
    Ok(())
}

/// Storage key of a role.
#[must_use]
pub fn role_key(name: &str) -> String {
    format!("{ROLES_PREFIX}{name}")
}
