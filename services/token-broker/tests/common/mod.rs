//! Shared harness for broker integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use test_utils::fixtures::{MANAGE_SCOPES, ROOT_SECRET, TEST_BASE_URL};
use test_utils::{MockConnector, MockUpstream};
use token_broker::credential::{ConfigureRequest, RootCredential};
use token_broker::storage::{self, CONFIG_KEY, MemoryStorage, Storage, StorageError};
use token_broker::{BrokerConfig, TokenBroker};

/// Storage whose writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    fail_puts: AtomicBool,
}

impl FlakyStorage {
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::new("write rejected"));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix).await
    }
}

pub struct Harness {
    pub upstream: Arc<MockUpstream>,
    pub connector: Arc<MockConnector>,
    pub storage: Arc<FlakyStorage>,
    pub broker: Arc<TokenBroker>,
    pub root_id: String,
}

impl Harness {
    /// Stored credential, read around the broker.
    pub async fn credential(&self) -> RootCredential {
        storage::read_json(self.storage.as_ref(), CONFIG_KEY)
            .await
            .unwrap()
            .unwrap()
    }

    /// Overwrite the stored credential, bypassing validation.
    pub async fn store_credential(&self, credential: &RootCredential) {
        storage::write_json(self.storage.as_ref(), CONFIG_KEY, credential)
            .await
            .unwrap();
    }

    /// Writes seen by the backing store.
    pub fn writes(&self) -> usize {
        self.storage.inner.writes()
    }
}

pub fn config() -> BrokerConfig {
    BrokerConfig {
        default_base_url: TEST_BASE_URL.to_string(),
        ..BrokerConfig::default()
    }
}

/// Broker over an upstream that knows the root token, not yet configured.
pub async fn harness_with(
    config: &BrokerConfig,
    connect_delay: Duration,
    root_expires_at: Option<DateTime<Utc>>,
) -> Harness {
    let upstream = MockUpstream::new();
    let root_id = upstream
        .seed_token(ROOT_SECRET, MANAGE_SCOPES, root_expires_at)
        .await;
    let connector = Arc::new(MockConnector::new(Arc::clone(&upstream)).with_delay(connect_delay));
    let storage = Arc::new(FlakyStorage::default());
    let broker = Arc::new(TokenBroker::new(
        Arc::clone(&storage) as Arc<dyn Storage>,
        Arc::clone(&connector) as Arc<dyn buddy_client::Connector>,
        config,
    ));

    Harness {
        upstream,
        connector,
        storage,
        broker,
        root_id,
    }
}

/// Broker with the root credential configured.
pub async fn configured(auto_rotate: bool, root_expires_at: Option<DateTime<Utc>>) -> Harness {
    let h = harness_with(&config(), Duration::ZERO, root_expires_at).await;
    h.broker
        .configure(ConfigureRequest::with_token(ROOT_SECRET).auto_rotate(auto_rotate))
        .await
        .unwrap();
    h
}
