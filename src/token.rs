//! The durable credential: [`AuthToken`] and its [`AuthScope`] values.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single permission string (e.g. `"user-read-email"`).
///
/// Scopes are owned by an [`AuthToken`]; order is irrelevant and values
/// are unique within a token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthScope(String);

impl AuthScope {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthScope {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The long-lived OAuth credential persisted by the token store.
///
/// `expires_at` is derived at write time from `expires_in`, never trusted
/// from the wire or from storage alone.
///
/// # Example
/// ```
/// use attune::token::{AuthToken, AuthScope};
///
/// let token = AuthToken::new("ACCESS_TOKEN", "Bearer", 3600)
///     .with_refresh_token(Some("REFRESH_TOKEN".to_string()))
///     .with_scopes(["user-read-email".into()]);
/// assert!(!token.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: BTreeSet<AuthScope>,
}

impl AuthToken {
    /// Build a token whose `expires_at` is derived from now + `expires_in`.
    /// A lifetime too large to represent saturates to the far future rather
    /// than wrapping or panicking.
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, expires_in: u64) -> Self {
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_in,
            expires_at,
            refresh_token: None,
            scopes: BTreeSet::new(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = AuthScope>) -> Self {
        self.scopes = scopes.into_iter().collect();
        self
    }

    /// Parse the endpoint's space-separated `scope` field.
    pub fn with_scope_string(mut self, scope: &str) -> Self {
        self.scopes = scope
            .split_whitespace()
            .map(AuthScope::from)
            .collect();
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether the token expires within the given window from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at - Utc::now() < window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_deduplicate_and_ignore_order() {
        let a = AuthToken::new("t", "Bearer", 60)
            .with_scopes(["read".into(), "write".into(), "read".into()]);
        let b = AuthToken::new("t", "Bearer", 60).with_scopes(["write".into(), "read".into()]);
        assert_eq!(a.scopes, b.scopes);
        assert_eq!(a.scopes.len(), 2);
    }

    #[test]
    fn scope_string_splits_on_whitespace() {
        let token = AuthToken::new("t", "Bearer", 60).with_scope_string("user-read-email  user-top-read");
        assert!(token.scopes.contains(&AuthScope::from("user-read-email")));
        assert!(token.scopes.contains(&AuthScope::from("user-top-read")));
        assert_eq!(token.scopes.len(), 2);
    }

    #[test]
    fn expires_at_derived_from_expires_in() {
        let token = AuthToken::new("t", "Bearer", 3600);
        assert!(!token.is_expired());
        assert!(token.expires_within(Duration::seconds(3601)));
        assert!(!token.expires_within(Duration::seconds(0)));
    }

    #[test]
    fn zero_lifetime_token_is_expired() {
        let token = AuthToken::new("t", "Bearer", 0);
        assert!(token.is_expired());
    }

    #[test]
    fn absurd_lifetime_saturates_instead_of_panicking() {
        let token = AuthToken::new("t", "Bearer", u64::MAX);
        assert!(!token.is_expired());
        assert_eq!(token.expires_at, DateTime::<Utc>::MAX_UTC);
        // Just past chrono's representable range, still within i64.
        let token = AuthToken::new("t", "Bearer", i64::MAX as u64);
        assert!(!token.is_expired());
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let token = AuthToken::new("acc", "Bearer", 3600)
            .with_refresh_token(Some("ref".into()))
            .with_scopes(["user-read-email".into()]);
        let raw = serde_json::to_vec(&token).unwrap();
        let restored: AuthToken = serde_json::from_slice(&raw).unwrap();
        assert_eq!(restored, token);
    }
}
