//! The ephemeral in-flight authorization attempt.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// State of a single in-flight authorization attempt.
///
/// Created when an authorization URL is issued, consumed (and cleared) when
/// the redirect comes back, whatever the outcome. A session older than the
/// configured TTL must never be exchanged for a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// PKCE secret; only ever transmitted in the final token-exchange request.
    pub code_verifier: String,
    /// Unguessable token echoed back through the authorization redirect.
    pub csrf_state: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(code_verifier: impl Into<String>, csrf_state: impl Into<String>) -> Self {
        Self {
            code_verifier: code_verifier.into(),
            csrf_state: csrf_state.into(),
            created_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fresh_session_is_not_expired() {
        let session = AuthSession::new("verifier", "state");
        assert!(!session.is_expired(Duration::minutes(10)));
    }

    #[test]
    fn epoch_session_is_expired() {
        let session = AuthSession {
            code_verifier: "verifier".into(),
            csrf_state: "state".into(),
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
        };
        assert!(session.is_expired(Duration::minutes(10)));
    }

    #[test]
    fn serde_uses_millisecond_timestamps() {
        let session = AuthSession {
            code_verifier: "v".into(),
            csrf_state: "s".into(),
            created_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["created_at"], 1_700_000_000_123i64);
        let restored: AuthSession = serde_json::from_value(json).unwrap();
        assert_eq!(restored, session);
    }
}
