//! Convenience re-exports for common use.

pub use crate::config::AuthConfig;
pub use crate::error::{AuthError, Error, Result, SecureStorageError, StorageError};
pub use crate::service::AuthService;
pub use crate::storage::SecureStorage;
pub use crate::token::{AuthScope, AuthToken};
