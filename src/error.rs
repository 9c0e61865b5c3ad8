//! Layered error vocabulary: persistence, cryptographic storage, and
//! protocol-level auth errors, plus the top-level [`Error`] union.
//!
//! Each layer only reports facts about its own mechanism; only the
//! orchestrator ([`crate::service::AuthService`]) translates between layers.
//! Every type here is `Clone` so a single-flight refresh can hand the same
//! outcome to every concurrent caller.

use thiserror::Error;

/// Result alias for fallible `attune` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Persistence-mechanism errors reported by the typed stores.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("No value stored")]
    NotFound,
    #[error("Storage read failed: {0}")]
    ReadFailed(String),
    #[error("Storage write failed: {0}")]
    WriteFailed(String),
    #[error("Stored data corrupted: {0}")]
    DataCorrupted(String),
}

/// Failures of the cryptographic layer beneath storage.
///
/// These propagate through the stores unchanged; they are never downgraded
/// to [`StorageError::NotFound`].
#[derive(Debug, Clone, Error)]
pub enum SecureStorageError {
    #[error("Secure storage initialization failed: {0}")]
    InitializationFailed(String),
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Union returned by store operations: either the persistence mechanism or
/// the cryptographic layer failed.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Secure(#[from] SecureStorageError),
}

/// Protocol-level authentication errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No usable credential (or no in-flight authorization) exists.
    #[error("Not authenticated")]
    NotAuthenticated,
    /// The authorization server rejected the grant itself; the stored
    /// credential (if any) is void.
    #[error("Expired or invalid grant")]
    InvalidGrant,
    /// The in-flight authorization session outlived its TTL.
    #[error("Authorization session expired")]
    SessionExpired,
    /// The redirect's `state` did not match the session's CSRF state.
    #[error("State parameter mismatch")]
    StateMismatch,
    /// The authorization server reported a denial on the redirect.
    #[error("Authorization denied: {error}")]
    Denied {
        error: String,
        description: Option<String>,
    },
}

/// Primary error type for all `attune` operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    SecureStorage(#[from] SecureStorageError),

    #[error("Network error: {0}")]
    Network(String),

    /// The caller handed over a redirect URI that is not a URL at all.
    /// Environment error, not a protocol violation.
    #[error("Invalid redirect URI: {0}")]
    InvalidRedirect(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Storage(inner) => Self::Storage(inner),
            StoreError::Secure(inner) => Self::SecureStorage(inner),
        }
    }
}

impl Error {
    /// Whether re-authentication (a fresh authorization flow) is the
    /// appropriate recovery for this error.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::NotAuthenticated)
                | Self::Auth(AuthError::InvalidGrant)
                | Self::Auth(AuthError::SessionExpired)
        )
    }

    /// Whether this error is plausibly transient (retry may succeed).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
