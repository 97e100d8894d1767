//! OAuth client for the external authorization server.
//!
//! Performs the two token-endpoint exchanges (authorization code with PKCE,
//! refresh token) and the userinfo lookup, normalizing their outcomes for
//! the session layer. The client authenticates itself with HTTP Basic
//! client credentials on every token call.

use std::time::Duration;

use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::pkce::PkceChallenge;
use super::token::TokenResponse;
use crate::error::{oauth_error, Error, ErrorKind, OAuthErrorKind};

/// Configuration for the authorization server, injected at construction.
///
/// The endpoint fields default to the conventional paths under
/// `server_url` when not overridden.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the authorization server.
    pub server_url: String,
    /// Confidential client id registered with the authorization server.
    pub client_id: String,
    /// Confidential client secret.
    pub client_secret: SecretString,
    /// Redirect URI, exactly as registered out-of-band.
    pub redirect_uri: String,
    /// Scope requested during authorization.
    pub scope: String,
    /// Override for the authorize endpoint.
    pub authorize_url: Option<String>,
    /// Override for the token endpoint.
    pub token_url: Option<String>,
    /// Override for the userinfo endpoint.
    pub userinfo_url: Option<String>,
    /// Bound on every request to the authorization server.
    pub timeout: Duration,
}

impl ClientConfig {
    fn authorize_url(&self) -> String {
        self.authorize_url
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/authorize", self.server_url))
    }

    fn token_url(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| format!("{}/oauth2/token", self.server_url))
    }

    fn userinfo_url(&self) -> String {
        self.userinfo_url
            .clone()
            .unwrap_or_else(|| format!("{}/userinfo", self.server_url))
    }
}

/// User information from the authorization server's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Outcome of a failed refresh-token exchange, normalized so the session
/// gate can branch on it exhaustively.
#[derive(Debug)]
pub enum RefreshError {
    /// The authorization server refused the refresh token; the user must
    /// log in again.
    Rejected(Error),
    /// The authorization server could not be reached or errored; trying
    /// again shortly may succeed.
    Unavailable(Error),
}

/// Request to exchange an authorization code for tokens
#[derive(Debug, Serialize)]
struct CodeExchangeRequest {
    grant_type: &'static str,
    code: String,
    redirect_uri: String,
    client_id: String,
    code_verifier: String,
}

/// Request to refresh an access token
#[derive(Debug, Serialize)]
struct TokenRefreshRequest {
    grant_type: &'static str,
    refresh_token: String,
    client_id: String,
}

/// Client for the authorization server's endpoints.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Create a new client with a bounded request timeout.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    /// Build the authorization URL the browser is sent to for user consent.
    pub fn authorize_url(&self, state: &str, challenge: &PkceChallenge) -> String {
        format!(
            "{}?\
            client_id={}&\
            redirect_uri={}&\
            response_type=code&\
            scope={}&\
            state={}&\
            code_challenge={}&\
            code_challenge_method=S256",
            self.config.authorize_url(),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scope),
            urlencoding::encode(state),
            urlencoding::encode(challenge.as_str()),
        )
    }

    /// Exchange an authorization code plus PKCE verifier for a token pair.
    ///
    /// Authorization codes are single-use and short-lived, so no retries:
    /// any error response surfaces immediately as `AuthorizationRejected`.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, Error> {
        let request = CodeExchangeRequest {
            grant_type: "authorization_code",
            code: code.to_string(),
            redirect_uri: self.config.redirect_uri.clone(),
            client_id: self.config.client_id.clone(),
            code_verifier: code_verifier.to_string(),
        };

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http
            .post(self.config.token_url())
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach token endpoint for code exchange: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::UpstreamUnavailable),
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let tokens: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse token response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
                }
            })?;
            info!("Successfully exchanged authorization code for tokens");
            Ok(tokens)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Authorization server rejected code exchange ({status}): {error_text}");
            if status.is_server_error() {
                Err(oauth_error(OAuthErrorKind::UpstreamUnavailable, &error_text))
            } else {
                Err(oauth_error(OAuthErrorKind::AuthorizationRejected, &error_text))
            }
        }
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The authorization server is the sole arbiter of refresh-token
    /// validity: a 4xx verdict is `Rejected`, everything that prevented a
    /// verdict (network, timeout, 5xx, unusable body) is `Unavailable`.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, RefreshError> {
        let request = TokenRefreshRequest {
            grant_type: "refresh_token",
            refresh_token: refresh_token.to_string(),
            client_id: self.config.client_id.clone(),
        };

        debug!("Refreshing access token");

        let response = self
            .http
            .post(self.config.token_url())
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach token endpoint for refresh: {e:?}");
                RefreshError::Unavailable(Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::UpstreamUnavailable),
                })
            })?;

        let status = response.status();
        if status.is_success() {
            let tokens: TokenResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse refresh response: {e:?}");
                RefreshError::Unavailable(Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
                })
            })?;
            info!("Successfully refreshed access token");
            Ok(tokens)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Refresh token exchange failed ({status}): {error_text}");
            if status.is_server_error() {
                Err(RefreshError::Unavailable(oauth_error(
                    OAuthErrorKind::UpstreamUnavailable,
                    &error_text,
                )))
            } else {
                Err(RefreshError::Rejected(oauth_error(
                    OAuthErrorKind::RefreshRejected,
                    &error_text,
                )))
            }
        }
    }

    /// Get user info using the access token.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .http
            .get(self.config.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to get user info: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::UpstreamUnavailable),
                }
            })?;

        if response.status().is_success() {
            let user_info: UserInfo = response.json().await.map_err(|e| {
                warn!("Failed to parse userinfo response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
                }
            })?;
            Ok(user_info)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Userinfo request failed: {error_text}");
            Err(oauth_error(OAuthErrorKind::InvalidResponse, &error_text))
        }
    }
}
