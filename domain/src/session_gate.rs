//! Session Authentication Gate.
//!
//! Turns the opaque `session_id` cookie into an authenticated request
//! context. Per request the gate looks the session up, decides whether the
//! stored access token is fresh, about to expire, or already expired, and
//! either proceeds, silently refreshes against the authorization server, or
//! rejects with a reason the HTTP layer renders as a 401.
//!
//! Refresh policy: a *proactive* refresh (token still valid but inside the
//! threshold) may fail without consequence for the current request; a
//! *reactive* refresh (token already expired) is the request's only way
//! forward and its failure is fatal. Keep this asymmetry: collapsing the
//! two paths logs users out unnecessarily right at the token boundary.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use entity::{sessions, users};
use identity_auth::encryption;
use identity_auth::oauth::{Client, RefreshError, TokenSet};
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::gateway;

/// A request context produced by a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The session's owning user.
    pub user: users::Model,
    /// Session id, i.e. the cookie value.
    pub session_id: String,
    /// Current expiry of the stored access token, for the client advisor.
    pub expires_at: DateTime<Utc>,
    /// True when this request refreshed the token pair; the HTTP layer must
    /// then re-issue the session cookie with a full 7-day lifetime.
    pub refreshed: bool,
}

/// Why a request was rejected. The variants carry no data so the HTTP
/// mapping stays exhaustive and compiler-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// No session cookie was presented.
    NoSession,
    /// The presented id does not exist in the session store.
    SessionNotFound,
    /// Access token expired and no refresh token exists.
    SessionExpired,
    /// Access token expired and the authorization server refused the
    /// refresh token.
    RefreshRejected,
    /// Access token expired and the authorization server could not be
    /// reached to refresh it.
    RefreshUnavailable,
    /// The session's owning user no longer exists.
    UserNotFound,
}

impl RejectionReason {
    /// User-facing message for the 401 response body.
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::NoSession => "No session found",
            RejectionReason::SessionNotFound => "Session not found",
            RejectionReason::SessionExpired => "Session expired",
            RejectionReason::RefreshRejected => "Refresh token expired. Please login again",
            RejectionReason::RefreshUnavailable => "Session expired and refresh failed",
            RejectionReason::UserNotFound => "User not found",
        }
    }
}

/// An authentication rejection, plus whether the client's cookie should be
/// expired to stop retry loops against a dead identifier.
#[derive(Debug, Clone, Copy)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub clear_cookie: bool,
}

impl Rejection {
    fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            clear_cookie: false,
        }
    }

    fn clearing_cookie(reason: RejectionReason) -> Self {
        Self {
            reason,
            clear_cookie: true,
        }
    }
}

/// Outcome of running the gate for one request.
#[derive(Debug)]
pub enum Verdict {
    Allowed(Authenticated),
    Denied(Rejection),
}

/// Why a refresh attempt did not produce a fresh session row.
enum RefreshFailure {
    /// The authorization server refused the refresh token.
    Rejected,
    /// The authorization server was unreachable or errored.
    Unavailable,
    /// The session no longer holds a usable refresh token.
    MissingToken,
    /// The session row disappeared while we held the refresh lock (logout).
    Gone,
    /// The session store itself failed.
    Store(Error),
}

/// The per-request session gate.
///
/// Holds the OAuth client for the authorization server and one async mutex
/// per session id so concurrent requests that both observe an expiring
/// token serialize their refresh: the winner exchanges the refresh token,
/// the loser re-reads the store and reuses the result.
pub struct SessionGate {
    oauth_client: Client,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
    encryption_key: String,
    refresh_threshold: Duration,
}

impl SessionGate {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            oauth_client: gateway::identity::new_client(config)?,
            refresh_locks: DashMap::new(),
            encryption_key: config.token_encryption_key().to_string(),
            refresh_threshold: Duration::seconds(config.refresh_threshold_secs),
        })
    }

    /// Authenticate one request from its session cookie value.
    ///
    /// `Err` is reserved for infrastructure failures (the session store
    /// itself); every authentication outcome, including all rejections, is
    /// a `Verdict`.
    pub async fn authenticate(
        &self,
        db: &DatabaseConnection,
        cookie_value: Option<&str>,
    ) -> Result<Verdict, Error> {
        let Some(session_id) = cookie_value else {
            return Ok(Verdict::Denied(Rejection::new(RejectionReason::NoSession)));
        };

        let Some(session) = entity_api::session::find_by_id(db, session_id).await? else {
            debug!("Session not found: {session_id}");
            return Ok(Verdict::Denied(Rejection::clearing_cookie(
                RejectionReason::SessionNotFound,
            )));
        };

        let now = Utc::now();
        let mut refreshed = false;

        let session = if session.is_expired(now) {
            if session.oauth_refresh_token.is_none() {
                // Terminal: the session cannot self-heal. No network call.
                return Ok(Verdict::Denied(Rejection::new(
                    RejectionReason::SessionExpired,
                )));
            }

            // Reactive refresh: the only way forward for this request.
            match self.refresh_session(db, &session, now).await {
                Ok(fresh) => {
                    refreshed = true;
                    fresh
                }
                Err(RefreshFailure::Rejected) => {
                    return Ok(Verdict::Denied(Rejection::new(
                        RejectionReason::RefreshRejected,
                    )))
                }
                Err(RefreshFailure::Unavailable) => {
                    return Ok(Verdict::Denied(Rejection::new(
                        RejectionReason::RefreshUnavailable,
                    )))
                }
                Err(RefreshFailure::MissingToken) => {
                    return Ok(Verdict::Denied(Rejection::new(
                        RejectionReason::SessionExpired,
                    )))
                }
                Err(RefreshFailure::Gone) => {
                    return Ok(Verdict::Denied(Rejection::clearing_cookie(
                        RejectionReason::SessionNotFound,
                    )))
                }
                Err(RefreshFailure::Store(e)) => return Err(e),
            }
        } else if self.within_threshold(&session, now) && session.oauth_refresh_token.is_some() {
            // Proactive refresh: never fatal, the current token is still
            // valid and will carry this request if the refresh fails.
            match self.refresh_session(db, &session, now).await {
                Ok(fresh) => {
                    refreshed = true;
                    fresh
                }
                Err(RefreshFailure::Gone) => {
                    return Ok(Verdict::Denied(Rejection::clearing_cookie(
                        RejectionReason::SessionNotFound,
                    )))
                }
                Err(failure) => {
                    if let RefreshFailure::Store(e) = &failure {
                        warn!(
                            "Proactive refresh store failure for session {}: {e:?}",
                            session.id
                        );
                    } else {
                        warn!(
                            "Proactive token refresh failed for session {}, proceeding with still-valid token",
                            session.id
                        );
                    }
                    session
                }
            }
        } else {
            session
        };

        let Some(user) = entity_api::user::find_by_id(db, session.user_id).await? else {
            // A session must never outlive its user.
            warn!("Session {} belongs to a deleted user", session.id);
            return Ok(Verdict::Denied(Rejection::new(RejectionReason::UserNotFound)));
        };

        Ok(Verdict::Allowed(Authenticated {
            user,
            session_id: session.id.clone(),
            expires_at: session.expires_at.with_timezone(&Utc),
            refreshed,
        }))
    }

    fn within_threshold(&self, session: &sessions::Model, now: DateTime<Utc>) -> bool {
        session.expires_at.with_timezone(&Utc) <= now + self.refresh_threshold
    }

    /// Refresh the session's token pair behind its per-session lock.
    ///
    /// After acquiring the lock the session is re-read: a concurrent
    /// request may have already refreshed (reuse its result) or logged the
    /// session out (report `Gone`).
    async fn refresh_session(
        &self,
        db: &DatabaseConnection,
        session: &sessions::Model,
        now: DateTime<Utc>,
    ) -> Result<sessions::Model, RefreshFailure> {
        let lock = self
            .refresh_locks
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let current = entity_api::session::find_by_id(db, &session.id)
            .await
            .map_err(|e| RefreshFailure::Store(e.into()))?
            .ok_or(RefreshFailure::Gone)?;

        if !current.is_expired(now) && !self.within_threshold(&current, now) {
            debug!("Session {} was refreshed by a concurrent request", current.id);
            return Ok(current);
        }

        let Some(encrypted_refresh) = current.oauth_refresh_token.as_deref() else {
            return Err(RefreshFailure::MissingToken);
        };

        let refresh_token = match encryption::decrypt(encrypted_refresh, &self.encryption_key) {
            Ok(token) => token,
            Err(e) => {
                error!(
                    "Failed to decrypt refresh token for session {}: {e:?}",
                    current.id
                );
                return Err(RefreshFailure::MissingToken);
            }
        };

        let started = Instant::now();
        let tokens = match self.oauth_client.refresh_token(&refresh_token).await {
            Ok(response) => response.into_token_set(Utc::now()),
            Err(RefreshError::Rejected(e)) => {
                warn!(
                    "Refresh rejected for session {} after {:?}: {e:?}",
                    current.id,
                    started.elapsed()
                );
                return Err(RefreshFailure::Rejected);
            }
            Err(RefreshError::Unavailable(e)) => {
                warn!(
                    "Authorization server unavailable for session {} after {:?}: {e:?}",
                    current.id,
                    started.elapsed()
                );
                return Err(RefreshFailure::Unavailable);
            }
        };

        let updated = self
            .store_refreshed_tokens(db, &current.id, &tokens)
            .await
            .map_err(RefreshFailure::Store)?;

        info!(
            "Refreshed tokens for session {} in {:?}, new expiry {}",
            updated.id,
            started.elapsed(),
            updated.expires_at
        );

        Ok(updated)
    }

    async fn store_refreshed_tokens(
        &self,
        db: &DatabaseConnection,
        session_id: &str,
        tokens: &TokenSet,
    ) -> Result<sessions::Model, Error> {
        let encrypted_access =
            encryption::encrypt(tokens.access_token_str(), &self.encryption_key)?;
        let encrypted_refresh =
            encryption::encrypt_optional(tokens.refresh_token_str(), &self.encryption_key)?;

        Ok(entity_api::session::update_tokens(
            db,
            session_id,
            encrypted_access,
            encrypted_refresh,
            tokens.expires_at,
        )
        .await?)
    }
}
