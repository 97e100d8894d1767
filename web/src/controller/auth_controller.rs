//! Controller for the OAuth login flow and the authenticated identity
//! surface.
//!
//! The browser completes the PKCE redirect dance on its own and posts the
//! authorization code plus its retained verifier here; tokens obtained from
//! the authorization server stay on this side of the cookie.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use log::*;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use domain::error::{DomainErrorKind, EntityErrorKind, InternalErrorKind};

use crate::error::{error_response, Error, Result as WebResult};
use crate::extractors::CurrentSession;
use crate::middleware::session::{clear_session_cookie, session_cookie};
use crate::AppState;

/// Body of the authorization-code callback.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OAuthCallbackParams {
    /// One-time authorization code from the authorization server redirect.
    pub code: String,
    /// PKCE verifier retained by the browser for the duration of the flow.
    pub code_verifier: String,
}

/// POST /auth/oauth/callback
///
/// Exchanges the authorization code server-side and answers with the user
/// profile plus the httpOnly session cookie. Raw OAuth tokens are never
/// part of the response.
#[utoipa::path(
    post,
    path = "/auth/oauth/callback",
    request_body(content = OAuthCallbackParams, content_type = "application/json"),
    responses(
        (status = 200, description = "Login successful, session cookie set"),
        (status = 400, description = "Missing parameters or authorization code rejected"),
        (status = 403, description = "Account has no role assigned"),
        (status = 404, description = "No local account for the authenticated email"),
        (status = 502, description = "Authorization server unavailable")
    )
)]
pub async fn oauth_callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(params): Json<OAuthCallbackParams>,
) -> Response {
    if params.code.is_empty() || params.code_verifier.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Code and code verifier are required",
        );
    }

    let outcome = match domain::login::complete_login(
        app_state.db_conn_ref(),
        &app_state.config,
        &params.code,
        &params.code_verifier,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("OAuth callback failed: {e:?}");
            return match &e.error_kind {
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)) => {
                    error_response(
                        StatusCode::NOT_FOUND,
                        "User not found in database. Please contact the administrator to create an account for you.",
                    )
                }
                DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::Forbidden,
                )) => error_response(
                    StatusCode::FORBIDDEN,
                    "No role assigned to your account. Please contact the administrator to assign a role before proceeding.",
                ),
                _ => Error::from(e).into_response(),
            };
        }
    };

    let cookie = session_cookie(
        &outcome.session_id,
        app_state.config.session_cookie_ttl_days,
        app_state.config.is_production(),
    );

    let body = Json(json!({
        "success": true,
        "message": "Login successful",
        "user": outcome.user,
    }));

    (jar.add(cookie), body).into_response()
}

/// GET /auth/me
///
/// Returns the authenticated user's profile along with the current access
/// token expiry. The `token` block only feeds the client's expiry advisor;
/// the session middleware stays the authority on freshness, and requesting
/// this endpoint is itself what triggers a proactive refresh.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile of the authenticated user"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn me(
    State(app_state): State<AppState>,
    session: CurrentSession,
) -> WebResult<impl IntoResponse> {
    let profile = domain::user_profile::assemble(app_state.db_conn_ref(), &session.user).await?;
    let expires_in = (session.expires_at - Utc::now()).num_seconds().max(0);

    Ok(Json(json!({
        "success": true,
        "user": profile,
        "token": {
            "expires_at": session.expires_at.to_rfc3339(),
            "expires_in": expires_in,
        },
    })))
}

/// POST /auth/logout
///
/// Deletes the session row and expires the session cookie. The gate treats
/// the deleted row as any other dead identifier afterwards.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session destroyed and cookie cleared"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    jar: CookieJar,
    session: CurrentSession,
) -> WebResult<impl IntoResponse> {
    domain::login::logout(app_state.db_conn_ref(), &session.session_id).await?;

    let body = Json(json!({
        "success": true,
        "message": "Logged out successfully",
    }));

    Ok((jar.add(clear_session_cookie()), body))
}
