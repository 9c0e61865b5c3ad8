//! Remote token endpoint client (`POST /token`, form-encoded).

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{AuthError, Error};
use crate::token::AuthToken;

/// Client for the authorization server's token endpoint.
///
/// Handles the two grant types of the flow and classifies "invalid grant"
/// responses (HTTP 400/401 whose `error`/`reason` field is `invalid_grant`)
/// distinctly from all other remote failures.
pub struct TokenEndpoint {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
}

impl TokenEndpoint {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
        }
    }

    /// Exchange an authorization code for a token (PKCE verifier included).
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<AuthToken, Error> {
        debug!("exchanging authorization code");
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    /// Exchange a refresh token for a fresh credential.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthToken, Error> {
        debug!("refreshing access token");
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<AuthToken, Error> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            if is_invalid_grant(&body) {
                return Err(AuthError::InvalidGrant.into());
            }
            return Err(Error::InvalidResponse(format!(
                "token request failed with status {status}: {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::InvalidResponse(format!(
                "token request failed with status {status}"
            )));
        }
        let payload: TokenEndpointResponse = resp.json().await?;
        let mut token = AuthToken::new(payload.access_token, payload.token_type, payload.expires_in)
            .with_refresh_token(payload.refresh_token);
        if let Some(scope) = payload.scope.as_deref() {
            token = token.with_scope_string(scope);
        }
        Ok(token)
    }
}

fn is_invalid_grant(body: &str) -> bool {
    let Ok(payload) = serde_json::from_str::<TokenEndpointErrorBody>(body) else {
        return false;
    };
    payload.error.as_deref() == Some("invalid_grant")
        || payload.reason.as_deref() == Some("invalid_grant")
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointErrorBody {
    error: Option<String>,
    reason: Option<String>,
}
