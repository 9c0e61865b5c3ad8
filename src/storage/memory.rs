//! In-memory secure storage, for tests and short-lived embeddings.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StoreError};

/// Volatile [`SecureStorage`](super::SecureStorage) backed by a map.
///
/// `seed_raw` exists so tests can plant records that were never produced by
/// this crate (e.g. corrupt bytes).
#[derive(Debug, Default)]
pub struct MemorySecureStorage {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record verbatim, bypassing the typed store layer.
    pub fn seed_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.lock().insert(key.to_string(), value.into());
    }

    /// Raw bytes currently stored under `key`, if any.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl super::SecureStorage for MemorySecureStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Storage that fails every operation with a fixed error; test double for
/// exercising propagation policies.
#[derive(Debug)]
pub struct FailingSecureStorage {
    error: StoreError,
}

impl FailingSecureStorage {
    pub fn new(error: StoreError) -> Self {
        Self { error }
    }

    pub fn read_failed(message: &str) -> Self {
        Self::new(StorageError::ReadFailed(message.to_string()).into())
    }
}

#[async_trait]
impl super::SecureStorage for FailingSecureStorage {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(self.error.clone())
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        Err(self.error.clone())
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(self.error.clone())
    }
}
