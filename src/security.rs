//! PKCE and CSRF material generation (RFC 7636, S256 method).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 32;

/// Fresh PKCE + CSRF material for one authorization attempt.
///
/// The verifier is never derivable from the challenge; the challenge is
/// `BASE64URL(SHA256(code_verifier))` with no padding.
#[derive(Debug, Clone)]
pub struct PkceSession {
    pub code_verifier: String,
    pub code_challenge: String,
    pub csrf_state: String,
}

/// Generates PKCE verifier/challenge pairs and CSRF state tokens from a
/// cryptographically secure random source. Stateless; side effects are
/// limited to randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityProvider;

impl SecurityProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_session(&self) -> PkceSession {
        let code_verifier = random_urlsafe(VERIFIER_LEN);
        let code_challenge = challenge_for(&code_verifier);
        let csrf_state = random_urlsafe(STATE_LEN);
        PkceSession {
            code_verifier,
            code_challenge,
            csrf_state,
        }
    }
}

/// `BASE64URL(SHA256(verifier))`, no padding.
pub fn challenge_for(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Random string over [A-Za-z0-9], a subset of the RFC 7636 unreserved set.
fn random_urlsafe(len: usize) -> String {
    let mut rng = thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..62u8);
            match idx {
                0..=25 => (b'A' + idx) as char,
                26..=51 => (b'a' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_has_rfc_7636_shape() {
        let session = SecurityProvider::new().generate_session();
        assert_eq!(session.code_verifier.len(), VERIFIER_LEN);
        assert!(session.code_verifier.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(session.csrf_state.len(), STATE_LEN);
    }

    #[test]
    fn challenge_is_sha256_of_verifier() {
        let session = SecurityProvider::new().generate_session();
        assert_eq!(session.code_challenge, challenge_for(&session.code_verifier));
        // base64url, no padding
        assert!(!session.code_challenge.contains('='));
        assert!(!session.code_challenge.contains('+'));
        assert!(!session.code_challenge.contains('/'));
    }

    #[test]
    fn challenge_is_deterministic_for_a_verifier() {
        let verifier = "test_verifier_12345678901234567890123456789012345678901234";
        assert_eq!(challenge_for(verifier), challenge_for(verifier));
    }

    #[test]
    fn sessions_are_unique() {
        let provider = SecurityProvider::new();
        let mut verifiers = std::collections::HashSet::new();
        let mut states = std::collections::HashSet::new();
        for _ in 0..100 {
            let session = provider.generate_session();
            assert!(verifiers.insert(session.code_verifier));
            assert!(states.insert(session.csrf_state));
        }
    }
}
