//! The authorization orchestrator: the only component with protocol state
//! and the only place the error layers are translated into each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Url;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::authorize::AuthorizeUrlBuilder;
use crate::config::AuthConfig;
use crate::endpoint::TokenEndpoint;
use crate::error::{AuthError, Error, StorageError, StoreError};
use crate::security::SecurityProvider;
use crate::session::AuthSession;
use crate::storage::SecureStorage;
use crate::store::{SessionStore, TokenStore};
use crate::token::{AuthScope, AuthToken};

type RefreshFuture = Shared<BoxFuture<'static, Result<(), Error>>>;

/// Credential lifecycle orchestrator.
///
/// Drives the authorization-code-with-PKCE flow end to end: issues authorize
/// URLs, validates redirect callbacks, exchanges and refreshes tokens, and
/// owns the session and token slots. Refreshes are single-flight: concurrent
/// callers share one physical network call and observe the same outcome, and
/// the call runs on an application-lifetime runtime handle so one caller's
/// cancellation never aborts it.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use attune::config::AuthConfig;
/// use attune::service::AuthService;
/// use attune::storage::MemorySecureStorage;
///
/// # async fn example() -> attune::error::Result<()> {
/// let config = AuthConfig::new(
///     "my-client-id",
///     "https://app.example.com/callback",
///     "https://accounts.example.com/authorize",
///     "https://accounts.example.com/api/token",
/// );
/// let service = AuthService::new(config, Arc::new(MemorySecureStorage::new()))?;
/// let url = service.initiate_authorization(&["user-read-email".into()]).await?;
/// // open `url` in a browser, then hand the redirect back:
/// // service.complete_authorization(&redirect_uri).await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    inner: Arc<ServiceInner>,
    runtime: Option<Handle>,
    refresh_gate: Arc<StdMutex<RefreshGate>>,
}

struct ServiceInner {
    config: AuthConfig,
    security: SecurityProvider,
    authorize: AuthorizeUrlBuilder,
    sessions: SessionStore,
    tokens: TokenStore,
    endpoint: TokenEndpoint,
}

#[derive(Default)]
struct RefreshGate {
    next_round: u64,
    in_flight: Option<(u64, RefreshFuture)>,
}

impl AuthService {
    /// Fails with [`Error::Configuration`] if the configured endpoint URLs
    /// are malformed.
    pub fn new(config: AuthConfig, storage: Arc<dyn SecureStorage>) -> Result<Self, Error> {
        let authorize = AuthorizeUrlBuilder::new(&config)?;
        let endpoint = TokenEndpoint::new(&config);
        Ok(Self {
            inner: Arc::new(ServiceInner {
                security: SecurityProvider::new(),
                authorize,
                sessions: SessionStore::new(storage.clone()),
                tokens: TokenStore::new(storage),
                endpoint,
                config,
            }),
            runtime: None,
            refresh_gate: Arc::new(StdMutex::new(RefreshGate::default())),
        })
    }

    /// Inject the application-lifetime runtime used for refresh calls.
    /// Defaults to the runtime current at the first refresh.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Begin an authorization attempt: generate PKCE + CSRF material,
    /// persist the session (overwriting any prior in-flight attempt) and
    /// return the URL to open in the user's browser.
    pub async fn initiate_authorization(&self, scopes: &[AuthScope]) -> Result<Url, Error> {
        let pkce = self.inner.security.generate_session();
        let url = self
            .inner
            .authorize
            .build(scopes, &pkce.code_challenge, &pkce.csrf_state);
        let session = AuthSession::new(pkce.code_verifier, pkce.csrf_state);
        self.inner.sessions.save(&session).await?;
        debug!("authorization session created");
        Ok(url)
    }

    /// Complete an authorization attempt from the redirect the browser
    /// delivered.
    ///
    /// The CSRF state comparison happens strictly before any network call,
    /// and the session is consumed on every outcome past a successful load,
    /// so an attempt is never replayable.
    pub async fn complete_authorization(&self, redirect_uri: &str) -> Result<(), Error> {
        let url =
            Url::parse(redirect_uri).map_err(|e| Error::InvalidRedirect(e.to_string()))?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            debug!(error = error.as_str(), "authorization denied by server");
            return Err(AuthError::Denied {
                error: error.clone(),
                description: params.get("error_description").cloned(),
            }
            .into());
        }

        let session = match self.inner.sessions.load().await {
            Ok(session) => session,
            Err(StoreError::Storage(StorageError::NotFound)) => {
                return Err(AuthError::NotAuthenticated.into())
            }
            Err(other) => return Err(other.into()),
        };

        let result = self.inner.finish_authorization(&params, &session).await;

        // Single-use: the session never survives a completion attempt.
        match (result, self.inner.sessions.clear().await) {
            (Ok(()), Err(clear_err)) => Err(clear_err.into()),
            (result, _) => result,
        }
    }

    /// Read the stored credential.
    ///
    /// A corrupted slot is unrecoverable locally: it is cleared so it cannot
    /// fail repeatedly, and the corruption error is surfaced. `NotFound`
    /// means "not authenticated" and surfaces unchanged.
    pub async fn get_token(&self) -> Result<AuthToken, Error> {
        self.inner.load_token_healing().await
    }

    /// Persist a credential through the refresh-preserving write.
    pub async fn save_token(&self, token: &AuthToken) -> Result<(), Error> {
        self.inner.save_token_merged(token).await
    }

    /// Whether a credential is currently stored.
    pub async fn logged_in(&self) -> Result<bool, Error> {
        match self.inner.load_token_healing().await {
            Ok(_) => Ok(true),
            Err(Error::Storage(StorageError::NotFound)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Renew the stored credential via the refresh grant.
    ///
    /// Single-flight: while a physical refresh is in flight, further calls
    /// await the same shared outcome instead of issuing their own request.
    /// The refresh itself runs as a spawned task, so dropping a caller's
    /// future cancels only that caller's wait.
    pub async fn refresh_token(&self) -> Result<(), Error> {
        self.obtain_refresh_future().await
    }

    /// Remove the stored credential.
    pub async fn clear_tokens(&self) -> Result<(), Error> {
        self.inner.tokens.clear().await.map_err(Error::from)
    }

    fn obtain_refresh_future(&self) -> RefreshFuture {
        let mut gate = lock_gate(&self.refresh_gate);
        if let Some((_, in_flight)) = gate.in_flight.as_ref() {
            // A completed round is never reused; each new round gets a
            // fresh network call.
            if in_flight.peek().is_none() {
                return in_flight.clone();
            }
        }

        let round = gate.next_round;
        gate.next_round += 1;
        let handle = self
            .runtime
            .clone()
            .unwrap_or_else(Handle::current);
        // The task itself retires its gate entry: the entry must not outlive
        // the physical refresh even when every caller drops its future
        // before completion.
        let task = handle.spawn({
            let inner = Arc::clone(&self.inner);
            let gate_slot = Arc::clone(&self.refresh_gate);
            async move {
                let result = inner.refresh_once().await;
                clear_round(&gate_slot, round);
                result
            }
        });

        let gate_slot = Arc::clone(&self.refresh_gate);
        let shared: RefreshFuture = async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    // The task unwound before retiring its entry.
                    clear_round(&gate_slot, round);
                    Err(Error::Unexpected(format!("refresh task failed: {join_err}")))
                }
            }
        }
        .boxed()
        .shared();

        gate.in_flight = Some((round, shared.clone()));
        shared
    }
}

impl ServiceInner {
    async fn finish_authorization(
        &self,
        params: &HashMap<String, String>,
        session: &AuthSession,
    ) -> Result<(), Error> {
        if session.is_expired(self.config.session_ttl) {
            return Err(AuthError::SessionExpired.into());
        }
        if params.get("state").map(String::as_str) != Some(session.csrf_state.as_str()) {
            warn!("redirect state does not match session state");
            return Err(AuthError::StateMismatch.into());
        }
        let code = params.get("code").ok_or_else(|| {
            Error::InvalidResponse("redirect missing authorization code".to_string())
        })?;

        match self
            .endpoint
            .exchange_code(code, &self.config.redirect_uri, &session.code_verifier)
            .await
        {
            Ok(token) => {
                self.save_token_merged(&token).await?;
                debug!("authorization complete, credential stored");
                Ok(())
            }
            Err(Error::Auth(AuthError::InvalidGrant)) => {
                // A stale credential must not linger once the server has
                // voided the grant.
                warn!("authorization code rejected, clearing credential");
                self.clear_tokens_logged().await;
                Err(AuthError::InvalidGrant.into())
            }
            Err(other) => Err(other),
        }
    }

    async fn refresh_once(&self) -> Result<(), Error> {
        let token = match self.load_token_healing().await {
            Ok(token) => token,
            Err(Error::Storage(StorageError::NotFound)) => {
                return Err(AuthError::NotAuthenticated.into())
            }
            Err(other) => return Err(other),
        };
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            // An access-only credential cannot self-renew.
            return Err(AuthError::NotAuthenticated.into());
        };

        match self.endpoint.refresh(refresh_token).await {
            Ok(new_token) => {
                self.save_token_merged(&new_token).await?;
                debug!("access token refreshed");
                Ok(())
            }
            Err(Error::Auth(AuthError::InvalidGrant)) => {
                warn!("refresh token rejected, clearing credential");
                self.clear_tokens_logged().await;
                Err(AuthError::InvalidGrant.into())
            }
            Err(other) => Err(other),
        }
    }

    /// Best-effort credential clear on paths that already carry their own
    /// error. A failure here leaves a voided credential behind, which must
    /// at least be visible in the logs.
    async fn clear_tokens_logged(&self) {
        if let Err(err) = self.tokens.clear().await {
            warn!(error = %err, "failed to clear voided credential");
        }
    }

    async fn load_token_healing(&self) -> Result<AuthToken, Error> {
        match self.tokens.load().await {
            Ok(token) => Ok(token),
            Err(StoreError::Storage(StorageError::DataCorrupted(message))) => {
                warn!("stored credential corrupted, clearing slot");
                self.clear_tokens_logged().await;
                Err(StorageError::DataCorrupted(message).into())
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn save_token_merged(&self, token: &AuthToken) -> Result<(), Error> {
        match self.tokens.save(token).await {
            Ok(()) => Ok(()),
            Err(StoreError::Storage(StorageError::DataCorrupted(message))) => {
                warn!("stored credential corrupted during merge, clearing slot");
                self.clear_tokens_logged().await;
                Err(StorageError::DataCorrupted(message).into())
            }
            Err(other) => Err(other.into()),
        }
    }
}

fn lock_gate(gate: &StdMutex<RefreshGate>) -> MutexGuard<'_, RefreshGate> {
    match gate.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn clear_round(gate: &StdMutex<RefreshGate>, round: u64) {
    let mut gate = lock_gate(gate);
    if matches!(gate.in_flight.as_ref(), Some((r, _)) if *r == round) {
        gate.in_flight = None;
    }
}
