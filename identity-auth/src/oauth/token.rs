//! OAuth token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Seconds of validity assumed when the authorization server omits
/// `expires_in` from a token response.
const DEFAULT_EXPIRES_IN_SECS: i64 = 900;

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

/// Token response as it comes off the wire from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl TokenResponse {
    /// Converts the wire response into a [`TokenSet`], anchoring the
    /// relative `expires_in` to `now`.
    pub fn into_token_set(self, now: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: now + Duration::seconds(self.expires_in),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

/// An issued OAuth token pair with its absolute expiry.
#[derive(Debug, Clone)]
pub struct TokenSet {
    /// Access token for the identity server's resource endpoints.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens; absent for flows
    /// that never returned one.
    pub refresh_token: Option<SecretString>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Granted scope.
    pub scope: String,
}

impl TokenSet {
    /// True once the access token's expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True while the access token is still valid but will expire within
    /// `threshold`.
    pub fn expires_within(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        !self.is_expired(now) && self.expires_at <= now + threshold
    }

    /// Access token as a plain string, for callers that must persist or
    /// transmit it.
    pub fn access_token_str(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Refresh token as a plain string, when present.
    pub fn refresh_token_str(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_set(expires_at: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: SecretString::from("access".to_string()),
            refresh_token: None,
            expires_at,
            token_type: "Bearer".to_string(),
            scope: String::new(),
        }
    }

    #[test]
    fn expires_in_defaults_when_omitted() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(response.expires_in, 900);
    }

    #[test]
    fn token_outside_threshold_is_neither_expired_nor_expiring() {
        let now = Utc::now();
        let tokens = token_set(now + Duration::hours(1));
        assert!(!tokens.is_expired(now));
        assert!(!tokens.expires_within(now, Duration::minutes(5)));
    }

    #[test]
    fn token_inside_threshold_is_expiring_but_not_expired() {
        let now = Utc::now();
        let tokens = token_set(now + Duration::minutes(2));
        assert!(!tokens.is_expired(now));
        assert!(tokens.expires_within(now, Duration::minutes(5)));
    }

    #[test]
    fn expired_token_is_not_reported_as_expiring() {
        let now = Utc::now();
        let tokens = token_set(now - Duration::minutes(10));
        assert!(tokens.is_expired(now));
        assert!(!tokens.expires_within(now, Duration::minutes(5)));
    }
}
