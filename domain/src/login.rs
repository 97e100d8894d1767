//! PKCE login coordinator, server half.
//!
//! The browser runs the redirect dance: it generates the PKCE verifier,
//! sends the S256 challenge with the authorize redirect, checks the `state`
//! echo, and finally posts the one-time authorization code together with
//! the retained verifier to this module. From here everything is
//! server-side: code exchange, userinfo lookup, local-account gating, and
//! creation of the session row. The browser only ever receives the opaque
//! session cookie and a profile payload; no OAuth token crosses back.

use chrono::Utc;
use entity::sessions;
use identity_auth::encryption;
use log::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::DatabaseConnection;
use service::config::Config;

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::gateway;
use crate::user_profile::{self, UserProfile};

/// Length of the opaque session id; doubles as the cookie value.
const SESSION_ID_LEN: usize = 40;

/// Result of a completed code exchange: what the HTTP layer needs to set
/// the cookie and answer the browser.
#[derive(Debug)]
pub struct LoginSuccess {
    pub session_id: String,
    pub user: UserProfile,
    pub expires_at: chrono::DateTime<Utc>,
}

fn entity_error(kind: EntityErrorKind) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(kind)),
    }
}

/// Generate an unguessable session identifier.
fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Exchange an authorization code (plus its PKCE verifier) for a session.
///
/// The authorization server verifies that the verifier matches the
/// challenge sent at redirect time; this module never substitutes its own.
/// A rejected exchange surfaces as `AuthorizationRejected`; authorization
/// codes are single-use, so there is nothing to retry.
pub async fn complete_login(
    db: &DatabaseConnection,
    config: &Config,
    code: &str,
    code_verifier: &str,
) -> Result<LoginSuccess, Error> {
    let client = gateway::identity::new_client(config)?;

    let tokens = client
        .exchange_code(code, code_verifier)
        .await
        .inspect_err(|e| warn!("Authorization code exchange failed: {e:?}"))?
        .into_token_set(Utc::now());

    let user_info = client
        .user_info(tokens.access_token_str())
        .await
        .inspect_err(|e| warn!("Failed to fetch userinfo after code exchange: {e:?}"))?;

    let Some(user) = entity_api::user::find_by_email(db, &user_info.email).await? else {
        info!(
            "OAuth login for unprovisioned account: {}",
            user_info.email
        );
        return Err(entity_error(EntityErrorKind::NotFound));
    };

    if user.role_id.is_none() {
        info!("OAuth login for user {} without a role", user.id);
        return Err(entity_error(EntityErrorKind::Forbidden));
    }

    if !user.is_active {
        info!("OAuth login for deactivated user {}", user.id);
        return Err(entity_error(EntityErrorKind::Forbidden));
    }

    let key = config.token_encryption_key();
    let encrypted_access = encryption::encrypt(tokens.access_token_str(), key)?;
    let encrypted_refresh = encryption::encrypt_optional(tokens.refresh_token_str(), key)?;

    let session_id = generate_session_id();
    let session: sessions::Model = entity_api::session::create(
        db,
        session_id.clone(),
        user.id,
        encrypted_access,
        encrypted_refresh,
        tokens.expires_at,
    )
    .await?;

    info!("Created session for user {}", user.id);

    let profile = user_profile::assemble(db, &user).await?;

    Ok(LoginSuccess {
        session_id: session.id,
        user: profile,
        expires_at: tokens.expires_at,
    })
}

/// Destroy a session (logout). Idempotent: a second logout with the same
/// cookie is a no-op.
pub async fn logout(db: &DatabaseConnection, session_id: &str) -> Result<(), Error> {
    entity_api::session::delete_by_id(db, session_id).await?;
    info!("Deleted session on logout");
    Ok(())
}

/// Delete sessions whose access token expired before now, logging the
/// counts the way an operator wants to see them. Run from the maintenance
/// flag of the server binary, typically via cron.
pub async fn sweep_expired_sessions(db: &DatabaseConnection) -> Result<u64, Error> {
    let deleted = entity_api::session::delete_expired(db, Utc::now()).await?;
    if deleted == 0 {
        info!("No expired sessions found");
        return Ok(0);
    }
    let remaining = entity_api::session::count(db).await?;
    info!("Deleted {deleted} expired session(s), {remaining} session(s) remaining");
    Ok(deleted)
}


#[cfg(test)]
#[cfg(feature = "mock")]
mod login_tests {
    use super::*;
    use entity::{users, Id};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user_model(role_id: Option<Id>, is_active: bool) -> users::Model {
        let now = Utc::now();
        users::Model {
            id: Id::new_v4(),
            email: "writer@commonstories.org".to_string(),
            name: "Test Writer".to_string(),
            role_id,
            organization_id: None,
            is_active,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn token_endpoint_body() -> &'static str {
        r#"{"access_token": "at-1", "refresh_token": "rt-1", "expires_in": 900, "token_type": "Bearer"}"#
    }

    fn userinfo_body() -> &'static str {
        r#"{"sub": "u-1", "email": "writer@commonstories.org", "name": "Test Writer"}"#
    }

    async fn mock_identity_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(token_endpoint_body())
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(userinfo_body())
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn complete_login_creates_a_session_and_returns_the_profile() {
        let server = mock_identity_server().await;
        let config = Config::default().set_oauth_server_url(server.url());

        let user = user_model(Some(Id::new_v4()), true);
        let now = Utc::now();
        let session = entity::sessions::Model {
            id: "a".repeat(40),
            user_id: user.id,
            oauth_access_token: "stored-encrypted".to_string(),
            oauth_refresh_token: Some("stored-encrypted-rt".to_string()),
            expires_at: (now + chrono::Duration::minutes(15)).into(),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // find_by_email
            .append_query_results(vec![vec![user.clone()]])
            // session insert (INSERT .. RETURNING)
            .append_query_results(vec![vec![session]])
            // role lookup for the profile
            .append_query_results(vec![vec![entity::roles::Model {
                id: user.role_id.unwrap(),
                role_name: "writer".to_string(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let outcome = complete_login(&db, &config, "code-1", "verifier-1")
            .await
            .unwrap();

        assert_eq!(outcome.session_id.len(), 40);
        assert_eq!(outcome.user.email, "writer@commonstories.org");
        assert_eq!(outcome.user.role_name.as_deref(), Some("writer"));
        assert!(outcome.expires_at > now);
    }

    #[tokio::test]
    async fn complete_login_rejects_unprovisioned_accounts() {
        let server = mock_identity_server().await;
        let config = Config::default().set_oauth_server_url(server.url());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<users::Model, Vec<users::Model>, _>(vec![vec![]])
            .into_connection();

        let err = complete_login(&db, &config, "code-1", "verifier-1")
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
    }

    #[tokio::test]
    async fn complete_login_rejects_users_without_a_role() {
        let server = mock_identity_server().await;
        let config = Config::default().set_oauth_server_url(server.url());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![user_model(None, true)]])
            .into_connection();

        let err = complete_login(&db, &config, "code-1", "verifier-1")
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Forbidden))
        );
    }

    #[tokio::test]
    async fn complete_login_surfaces_a_rejected_code_without_touching_the_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;
        let config = Config::default().set_oauth_server_url(server.url());

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let err = complete_login(&db, &config, "bad-code", "verifier-1")
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(crate::error::ExternalErrorKind::AuthorizationRejected)
        );
    }
}
