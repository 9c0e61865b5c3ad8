//! AES-256-GCM encrypted file-backed secure storage.

use std::collections::HashMap;
use std::path::PathBuf;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{SecureStorageError, StorageError, StoreError};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// [`SecureStorage`](super::SecureStorage) persisting records to a single
/// file, each record encrypted with AES-256-GCM under a caller-supplied
/// 32-byte key. Key management stays with the caller.
///
/// A fresh random nonce is used for every write; a record that fails
/// authentication on decrypt surfaces as
/// [`SecureStorageError::DecryptionFailed`].
///
/// # Example
/// ```no_run
/// use attune::storage::EncryptedFileStorage;
///
/// let key = EncryptedFileStorage::generate_key();
/// let storage = EncryptedFileStorage::new("/tmp/attune.vault".into(), &key)?;
/// # Ok::<(), attune::error::StoreError>(())
/// ```
pub struct EncryptedFileStorage {
    path: PathBuf,
    cipher: Aes256Gcm,
    // Serializes read-modify-write cycles on the vault file.
    file_lock: Mutex<()>,
}

impl std::fmt::Debug for EncryptedFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFileStorage")
            .field("path", &self.path)
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl EncryptedFileStorage {
    /// Fails with [`SecureStorageError::InitializationFailed`] unless `key`
    /// is exactly 32 bytes.
    pub fn new(path: PathBuf, key: &[u8]) -> Result<Self, StoreError> {
        if key.len() != KEY_LEN {
            return Err(SecureStorageError::InitializationFailed(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
            .into());
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| {
            SecureStorageError::InitializationFailed(format!("cipher construction failed: {e}"))
        })?;
        Ok(Self {
            path,
            cipher,
            file_lock: Mutex::new(()),
        })
    }

    /// Generate a random 32-byte key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    async fn read_vault(&self) -> Result<VaultFile, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(VaultFile::default())
            }
            Err(err) => return Err(StorageError::ReadFailed(err.to_string()).into()),
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::DataCorrupted(format!("vault file unreadable: {e}")).into())
    }

    async fn write_vault(&self, vault: &VaultFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        let serialized = serde_json::to_vec(vault)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn encrypt_record(&self, plaintext: &[u8]) -> Result<EncryptedRecord, StoreError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext)
            .map_err(|e| SecureStorageError::EncryptionFailed(e.to_string()))?;
        Ok(EncryptedRecord {
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(ciphertext),
        })
    }

    fn decrypt_record(&self, record: &EncryptedRecord) -> Result<Vec<u8>, StoreError> {
        let nonce_bytes = BASE64
            .decode(&record.nonce)
            .map_err(|e| SecureStorageError::DecryptionFailed(format!("nonce: {e}")))?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes.as_slice().try_into().map_err(|_| {
            SecureStorageError::DecryptionFailed(format!(
                "nonce must be {NONCE_LEN} bytes for AES-256-GCM"
            ))
        })?;
        let ciphertext = BASE64
            .decode(&record.ciphertext)
            .map_err(|e| SecureStorageError::DecryptionFailed(format!("ciphertext: {e}")))?;
        self.cipher
            .decrypt(&Nonce::from(nonce), ciphertext.as_ref())
            .map_err(|e| SecureStorageError::DecryptionFailed(e.to_string()).into())
    }
}

#[async_trait]
impl super::SecureStorage for EncryptedFileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = self.file_lock.lock().await;
        let vault = self.read_vault().await?;
        match vault.records.get(key) {
            Some(record) => Ok(Some(self.decrypt_record(record)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let _guard = self.file_lock.lock().await;
        let mut vault = self.read_vault().await?;
        let record = self.encrypt_record(value)?;
        vault.records.insert(key.to_string(), record);
        self.write_vault(&vault).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.file_lock.lock().await;
        let mut vault = self.read_vault().await?;
        if vault.records.remove(key).is_some() {
            self.write_vault(&vault).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    records: HashMap<String, EncryptedRecord>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptedRecord {
    nonce: String,
    ciphertext: String,
}
