use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use domain::users;

use crate::error::error_response;

/// The authenticated request context attached by the session middleware.
///
/// Handlers behind `require_session` can extract either the whole context
/// or just the user.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: users::Model,
    pub session_id: String,
    /// Expiry of the stored access token, surfaced to the client advisor.
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Just the session's owning user, for handlers that don't care about the
/// session itself.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub users::Model);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        Ok(AuthenticatedUser(session.user))
    }
}
