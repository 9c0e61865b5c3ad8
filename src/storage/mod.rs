//! The injected secure-storage capability and bundled implementations.

pub mod encrypted_file;
pub mod memory;

pub use encrypted_file::EncryptedFileStorage;
pub use memory::MemorySecureStorage;

use async_trait::async_trait;

use crate::error::StoreError;

/// Encrypted get/set/remove of opaque byte records, keyed by name.
///
/// Implementations report mechanism facts only: IO faults as
/// [`crate::error::StorageError::ReadFailed`]/[`crate::error::StorageError::WriteFailed`],
/// cryptographic faults as the [`crate::error::SecureStorageError`] variants.
/// A missing record is `Ok(None)`, not an error; the typed stores above this
/// trait decide what absence means.
///
/// Operations must be atomic with respect to each other: a concurrent `set`
/// and `get` never produce a torn read.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
