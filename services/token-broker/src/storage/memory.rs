//! In-memory [`Storage`] backend.
//!
//! Entries live in a `BTreeMap` behind a `tokio` `RwLock`; clones share
//! state. Nothing survives the process.

use super::{Storage, StorageError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    writes: Arc<std::sync::atomic::AtomicUsize>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Return `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Number of `put` and `delete` calls served so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.record_write();
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.record_write();
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().await;
        let mut names: Vec<String> = Vec::new();

        for key in entries.keys() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            let child = match rest.find('/') {
                Some(idx) => &rest[..=idx],
                None => rest,
            };
            if !child.is_empty() && names.last().map(String::as_str) != Some(child) {
                names.push(child.to_string());
            }
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let storage = MemoryStorage::new();
        storage.put("config", b"v1").await.unwrap();
        assert_eq!(storage.get("config").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn delete_missing_key_succeeds() {
        let storage = MemoryStorage::new();
        storage.delete("nothing").await.unwrap();
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn list_returns_immediate_children() {
        let storage = MemoryStorage::new();
        storage.put("roles/ci", b"{}").await.unwrap();
        storage.put("roles/deploy", b"{}").await.unwrap();
        storage.put("roles/nested/a", b"{}").await.unwrap();
        storage.put("roles/nested/b", b"{}").await.unwrap();
        storage.put("config", b"{}").await.unwrap();

        let names = storage.list("roles/").await.unwrap();
        assert_eq!(names, vec!["ci", "deploy", "nested/"]);
    }

    #[tokio::test]
    async fn clone_shares_state_and_counts_writes() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        clone.put("k", b"v").await.unwrap();
        clone.delete("k").await.unwrap();

        assert_eq!(storage.writes(), 2);
        assert_eq!(storage.len().await, 0);
    }
}
