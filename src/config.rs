//! Authorization configuration: client identity, endpoints, session TTL.

use chrono::Duration;

use crate::error::Error;

/// Default maximum age of an in-flight authorization attempt.
const DEFAULT_SESSION_TTL_SECS: i64 = 10 * 60;

/// Configuration for the authorization flow.
///
/// Client id, redirect URI and the two endpoint URLs are baked in at
/// construction; malformed endpoint URLs surface as
/// [`Error::Configuration`] when the service is built, never at request time.
///
/// # Example
/// ```
/// use attune::config::AuthConfig;
///
/// let config = AuthConfig::new(
///     "my-client-id",
///     "https://app.example.com/callback",
///     "https://accounts.example.com/authorize",
///     "https://accounts.example.com/api/token",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub session_ttl: Duration,
}

impl AuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        authorize_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            authorize_url: authorize_url.into(),
            token_url: token_url.into(),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Load from environment variables (`ATTUNE_CLIENT_ID`,
    /// `ATTUNE_REDIRECT_URI`, `ATTUNE_AUTHORIZE_URL`, `ATTUNE_TOKEN_URL`),
    /// reading a `.env` file if present.
    pub fn from_env() -> Result<Self, Error> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| Error::Configuration(format!("missing environment variable {name}")))
        };
        Ok(Self::new(
            var("ATTUNE_CLIENT_ID")?,
            var("ATTUNE_REDIRECT_URI")?,
            var("ATTUNE_AUTHORIZE_URL")?,
            var("ATTUNE_TOKEN_URL")?,
        ))
    }
}
