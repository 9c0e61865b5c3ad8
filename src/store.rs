//! Typed single-slot stores over the injected [`SecureStorage`] capability.
//!
//! Each store owns exactly one persisted slot and exposes whole-object
//! save/load/clear only. A `tokio::sync::Mutex` per store keeps concurrent
//! operations from interleaving into a torn read.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{StorageError, StoreError};
use crate::session::AuthSession;
use crate::storage::SecureStorage;
use crate::token::AuthToken;

/// Slot key for the in-flight authorization session.
pub const SESSION_SLOT: &str = "auth.session";
/// Slot key for the durable credential.
pub const TOKEN_SLOT: &str = "auth.token";

async fn read_slot<T: DeserializeOwned>(
    storage: &dyn SecureStorage,
    slot: &str,
) -> Result<T, StoreError> {
    let bytes = storage
        .get(slot)
        .await?
        .ok_or(StorageError::NotFound)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| StorageError::DataCorrupted(e.to_string()).into())
}

async fn write_slot<T: Serialize>(
    storage: &dyn SecureStorage,
    slot: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
    storage.set(slot, &bytes).await
}

/// Single-slot persistence of the in-flight [`AuthSession`].
pub struct SessionStore {
    storage: Arc<dyn SecureStorage>,
    slot_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            slot_lock: Mutex::new(()),
        }
    }

    /// Overwrites any prior in-flight session; only one authorization
    /// attempt may be outstanding.
    pub async fn save(&self, session: &AuthSession) -> Result<(), StoreError> {
        let _guard = self.slot_lock.lock().await;
        write_slot(self.storage.as_ref(), SESSION_SLOT, session).await
    }

    /// Fails with [`StorageError::NotFound`] when no session is in flight.
    pub async fn load(&self) -> Result<AuthSession, StoreError> {
        let _guard = self.slot_lock.lock().await;
        read_slot(self.storage.as_ref(), SESSION_SLOT).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.slot_lock.lock().await;
        self.storage.remove(SESSION_SLOT).await
    }
}

/// Single-slot persistence of the durable [`AuthToken`].
pub struct TokenStore {
    storage: Arc<dyn SecureStorage>,
    slot_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            storage,
            slot_lock: Mutex::new(()),
        }
    }

    /// Refresh-preserving write.
    ///
    /// Servers are not required to re-issue a refresh token on every grant,
    /// so a write that carries no refresh token inherits whatever refresh
    /// token is already stored. With no prior token, absent stays absent.
    ///
    /// A corrupted prior value aborts the write and surfaces
    /// [`StorageError::DataCorrupted`]; the orchestrator decides what to do
    /// with the slot.
    pub async fn save(&self, token: &AuthToken) -> Result<(), StoreError> {
        let _guard = self.slot_lock.lock().await;
        let mut merged = token.clone();
        if merged.refresh_token.is_none() {
            match read_slot::<AuthToken>(self.storage.as_ref(), TOKEN_SLOT).await {
                Ok(previous) => merged.refresh_token = previous.refresh_token,
                Err(StoreError::Storage(StorageError::NotFound)) => {}
                Err(other) => return Err(other),
            }
        }
        write_slot(self.storage.as_ref(), TOKEN_SLOT, &merged).await
    }

    /// Fails with [`StorageError::NotFound`] when no credential is stored.
    pub async fn load(&self) -> Result<AuthToken, StoreError> {
        let _guard = self.slot_lock.lock().await;
        read_slot(self.storage.as_ref(), TOKEN_SLOT).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.slot_lock.lock().await;
        self.storage.remove(TOKEN_SLOT).await
    }
}
