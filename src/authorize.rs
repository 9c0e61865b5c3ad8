//! Pure assembly of the authorize-endpoint URL.

use reqwest::Url;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::token::AuthScope;

/// Builds the authorization URL for the authorize endpoint.
///
/// Deterministic given its inputs; all query parameters are percent-encoded.
/// Client id and redirect URI are baked in at construction.
#[derive(Debug, Clone)]
pub struct AuthorizeUrlBuilder {
    authorize_url: Url,
    client_id: String,
    redirect_uri: String,
}

impl AuthorizeUrlBuilder {
    /// Fails with [`Error::Configuration`] if the configured authorize
    /// endpoint is not a valid URL.
    pub fn new(config: &AuthConfig) -> Result<Self, Error> {
        let authorize_url = Url::parse(&config.authorize_url)
            .map_err(|e| Error::Configuration(format!("invalid authorize URL: {e}")))?;
        Ok(Self {
            authorize_url,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    pub fn build(&self, scopes: &[AuthScope], code_challenge: &str, csrf_state: &str) -> Url {
        let scope = scopes
            .iter()
            .map(AuthScope::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code_challenge_method", "S256")
            .append_pair("code_challenge", code_challenge)
            .append_pair("state", csrf_state)
            .append_pair("scope", &scope);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn builder() -> AuthorizeUrlBuilder {
        let config = AuthConfig::new(
            "client-123",
            "https://app.example.com/callback",
            "https://accounts.example.com/authorize",
            "https://accounts.example.com/api/token",
        );
        AuthorizeUrlBuilder::new(&config).unwrap()
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn build_includes_all_parameters() {
        let url = builder().build(
            &["user-read-email".into(), "user-top-read".into()],
            "CHALLENGE",
            "STATE_XYZ",
        );
        let params = query_map(&url);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "https://app.example.com/callback");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["code_challenge"], "CHALLENGE");
        assert_eq!(params["state"], "STATE_XYZ");
        assert_eq!(params["scope"], "user-read-email user-top-read");
    }

    #[test]
    fn build_percent_encodes_values() {
        let url = builder().build(&["scope one".into()], "ch+al/lenge", "st&ate");
        let raw = url.as_str();
        assert!(raw.contains("scope=scope+one") || raw.contains("scope=scope%20one"));
        assert!(!raw.contains("st&ate"));
    }

    #[test]
    fn build_is_deterministic() {
        let b = builder();
        let first = b.build(&["s".into()], "c", "st");
        let second = b.build(&["s".into()], "c", "st");
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_authorize_url_is_a_configuration_error() {
        let config = AuthConfig::new("id", "https://cb", "not a url", "https://t");
        let result = AuthorizeUrlBuilder::new(&config);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
