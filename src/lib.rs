//! Attune — OAuth 2.0 authorization-code + PKCE session and token lifecycle.
//!
//! Turns a one-time user authorization into a durable, renewable credential:
//! issues PKCE-protected authorize URLs, validates redirect callbacks (CSRF
//! state, session TTL), exchanges and refreshes tokens against the remote
//! token endpoint, and persists the credential in an injected encrypted
//! store with deterministic recovery from storage, network and crypto
//! failures.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use attune::prelude::*;
//! use attune::storage::MemorySecureStorage;
//!
//! # async fn example() -> attune::error::Result<()> {
//! let config = AuthConfig::new(
//!     "my-client-id",
//!     "https://app.example.com/callback",
//!     "https://accounts.example.com/authorize",
//!     "https://accounts.example.com/api/token",
//! );
//! let auth = AuthService::new(config, Arc::new(MemorySecureStorage::new()))?;
//!
//! let url = auth.initiate_authorization(&["user-read-email".into()]).await?;
//! // Open `url` in the user's browser; the platform hands back a redirect:
//! // auth.complete_authorization(&redirect_uri).await?;
//! let token = auth.get_token().await?;
//! println!("{}", token.access_token);
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod prelude;
pub mod security;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, Error, Result, SecureStorageError, StorageError, StoreError};
pub use service::AuthService;
pub use session::AuthSession;
pub use storage::SecureStorage;
pub use token::{AuthScope, AuthToken};
