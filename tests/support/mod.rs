#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use wiremock::{MockServer, ResponseTemplate};

use attune::config::AuthConfig;
use attune::service::AuthService;
use attune::storage::MemorySecureStorage;
use attune::token::AuthToken;

pub const REDIRECT_URI: &str = "https://app.example.com/callback";
pub const TOKEN_PATH: &str = "/api/token";

/// Service wired to a wiremock token endpoint, sharing its storage handle
/// so tests can inspect and seed raw slots.
pub fn service_with(server: &MockServer) -> (Arc<MemorySecureStorage>, AuthService) {
    let storage = Arc::new(MemorySecureStorage::new());
    let config = AuthConfig::new(
        "client-123",
        REDIRECT_URI,
        format!("{}/authorize", server.uri()),
        format!("{}{TOKEN_PATH}", server.uri()),
    );
    let service = AuthService::new(config, storage.clone()).expect("service construction");
    (storage, service)
}

pub fn token(access: &str, refresh: Option<&str>) -> AuthToken {
    AuthToken::new(access, "Bearer", 3600).with_refresh_token(refresh.map(String::from))
}

/// Successful token endpoint response; `refresh` omitted entirely when
/// `None`, matching servers that do not re-issue refresh tokens.
pub fn token_response(access: &str, refresh: Option<&str>) -> ResponseTemplate {
    let mut body = json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "user-read-email",
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

/// HTTP 401 with `reason=invalid_grant`, the shape the authorization server
/// uses for revoked or expired grants.
pub fn invalid_grant_response() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({ "reason": "invalid_grant" }))
}

pub fn query_param(url: &reqwest::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Build the redirect the platform would deliver after the user authorizes.
pub fn redirect_with(code: &str, state: &str) -> String {
    format!("{REDIRECT_URI}?code={code}&state={state}")
}
