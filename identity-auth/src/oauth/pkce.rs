//! PKCE (Proof Key for Code Exchange) support for OAuth 2.0.
//!
//! Implements RFC 7636 for binding an authorization code to the party that
//! initiated the flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE code verifier (random string).
///
/// Generated by the login client before the redirect and retained only for
/// the duration of the flow; never sent to the authorization server until
/// the code exchange.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a new random PKCE verifier of 43-128 characters.
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        let verifier = URL_SAFE_NO_PAD.encode(random_bytes);
        Self(verifier)
    }

    /// Create a PKCE verifier from an existing string.
    pub fn from_string(verifier: String) -> Self {
        Self(verifier)
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate the corresponding code challenge.
    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge::from_verifier(self)
    }
}

/// PKCE code challenge: the base64url-encoded SHA-256 digest of the
/// verifier (`code_challenge_method=S256`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create a code challenge from a verifier.
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_str().as_bytes());
        let hash = hasher.finalize();
        let challenge = URL_SAFE_NO_PAD.encode(hash);
        Self(challenge)
    }

    /// Get the challenge string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generate an opaque state token for CSRF protection of the callback.
///
/// The login client stores it before the redirect and compares for exact
/// equality on return.
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_meets_rfc_length() {
        let verifier = PkceVerifier::generate();
        assert!(verifier.as_str().len() >= 43);
        assert!(verifier.as_str().len() <= 128);
    }

    #[test]
    fn challenge_is_deterministic_for_a_verifier() {
        let verifier = PkceVerifier::from_string("test_verifier".to_string());
        assert_eq!(verifier.challenge(), verifier.challenge());
    }

    #[test]
    fn distinct_verifiers_produce_distinct_challenges() {
        let a = PkceVerifier::generate();
        let b = PkceVerifier::generate();
        assert_ne!(a.challenge(), b.challenge());
    }

    #[test]
    fn challenge_matches_known_s256_vector() {
        // Appendix B of RFC 7636
        let verifier =
            PkceVerifier::from_string("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(
            verifier.challenge().as_str(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn state_tokens_are_unique() {
        assert_ne!(generate_state(), generate_state());
    }
}
