//! Session authentication middleware.
//!
//! Resolves the `session_id` cookie through the domain session gate and
//! attaches the authenticated context to the request. When the gate
//! refreshed the underlying OAuth tokens, the outgoing response re-issues
//! the session cookie with a full lifetime, the only mechanism that
//! extends the user's effective login window. Rejections become the
//! `{ "success": false, "message": ... }` 401 the frontend expects, and a
//! dead session id additionally expires the client's cookie to stop retry
//! loops.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use log::error;

use domain::session_gate::Verdict;

use crate::error::{error_response, Error};
use crate::extractors::CurrentSession;
use crate::AppState;

pub(crate) const SESSION_COOKIE_NAME: &str = "session_id";

/// Build the session cookie with a fresh 7-day (configurable) lifetime.
pub(crate) fn session_cookie(session_id: &str, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

/// Build a removal cookie that expires the client's session cookie.
pub(crate) fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

fn append_set_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Failed to encode session cookie header: {e:?}"),
    }
}

/// Authentication middleware for every route that requires identity.
pub(crate) async fn require_session(
    State(app_state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_value = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    let verdict = app_state
        .session_gate
        .authenticate(app_state.db_conn_ref(), cookie_value.as_deref())
        .await;

    match verdict {
        Ok(Verdict::Allowed(auth)) => {
            let refreshed = auth.refreshed;
            let session_id = auth.session_id.clone();

            request.extensions_mut().insert(CurrentSession {
                user: auth.user,
                session_id: session_id.clone(),
                expires_at: auth.expires_at,
            });

            let mut response = next.run(request).await;

            if refreshed {
                let cookie = session_cookie(
                    &session_id,
                    app_state.config.session_cookie_ttl_days,
                    app_state.config.is_production(),
                );
                append_set_cookie(&mut response, &cookie);
            }

            response
        }
        Ok(Verdict::Denied(rejection)) => {
            let mut response =
                error_response(StatusCode::UNAUTHORIZED, rejection.reason.message());
            if rejection.clear_cookie {
                append_set_cookie(&mut response, &clear_session_cookie());
            }
            response
        }
        Err(e) => Error::from(e).into_response(),
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::{Duration, Utc};
    use domain::{sessions, users, Id};
    use identity_auth::encryption;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SESSION_ID: &str = "k9KfHqGKYVDCzeAXssw6rLzMJyifJlSPSgcBm2fd";

    async fn test_handler(user: crate::extractors::AuthenticatedUser) -> String {
        user.0.email
    }

    fn test_app(db: sea_orm::DatabaseConnection) -> Router {
        let config = Config::default();
        let app_state = crate::AppState::new(config, &Arc::new(db)).unwrap();

        Router::new()
            .route("/test", get(test_handler))
            .route_layer(from_fn_with_state(app_state.clone(), require_session))
            .with_state(app_state)
    }

    fn session_model(expires_at: chrono::DateTime<Utc>, with_refresh_token: bool) -> sessions::Model {
        let now = Utc::now();
        let key = Config::default().token_encryption_key().to_string();
        sessions::Model {
            id: SESSION_ID.to_string(),
            user_id: Id::new_v4(),
            oauth_access_token: encryption::encrypt("at-plain", &key).unwrap(),
            oauth_refresh_token: if with_refresh_token {
                Some(encryption::encrypt("rt-plain", &key).unwrap())
            } else {
                None
            },
            expires_at: expires_at.into(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn user_model(id: Id) -> users::Model {
        let now = Utc::now();
        users::Model {
            id,
            email: "writer@commonstories.org".to_string(),
            name: "Test Writer".to_string(),
            role_id: Some(Id::new_v4()),
            organization_id: None,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_cookie_yields_401_with_the_expected_envelope() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let app = test_app(db);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No session found");
    }

    #[tokio::test]
    async fn unknown_session_id_yields_401_and_expires_the_cookie() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<sessions::Model, Vec<sessions::Model>, _>(vec![vec![]])
            .into_connection();
        let app = test_app(db);

        let request = Request::builder()
            .uri("/test")
            .header("cookie", format!("{SESSION_COOKIE_NAME}=forged-session-id"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("expired cookie directive")
            .to_string();
        assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));
        assert!(set_cookie.contains("Max-Age=0"));

        let body = body_json(response).await;
        assert_eq!(body["message"], "Session not found");
    }

    #[tokio::test]
    async fn fresh_session_passes_through_without_rewriting_the_cookie() {
        let session = session_model(Utc::now() + Duration::hours(1), true);
        let user = user_model(session.user_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![session]])
            .append_query_results(vec![vec![user]])
            .into_connection();
        let app = test_app(db);

        let request = Request::builder()
            .uri("/test")
            .header("cookie", format!("{SESSION_COOKIE_NAME}={SESSION_ID}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_yields_401_session_expired() {
        let session = session_model(Utc::now() - Duration::minutes(10), false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![session]])
            .into_connection();
        let app = test_app(db);

        let request = Request::builder()
            .uri("/test")
            .header("cookie", format!("{SESSION_COOKIE_NAME}={SESSION_ID}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Session expired");
    }

    #[tokio::test]
    async fn session_cookie_is_scoped_and_http_only() {
        let cookie = session_cookie(SESSION_ID, 7, true);
        let rendered = cookie.to_string();
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
    }
}
