use super::error::Error;
use chrono::{DateTime, Utc};
use entity::sessions::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::debug;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, PaginatorTrait,
};

/// Creates a new session record for a user.
///
/// The caller supplies the opaque session id and the (already encrypted)
/// OAuth token pair; `created_at`/`updated_at` are stamped here.
pub async fn create(
    db: &DatabaseConnection,
    id: String,
    user_id: Id,
    oauth_access_token: String,
    oauth_refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
) -> Result<Model, Error> {
    debug!("Creating session for user_id: {user_id}");

    let now = chrono::Utc::now();

    let active_model = ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        oauth_access_token: Set(oauth_access_token),
        oauth_refresh_token: Set(oauth_refresh_token),
        expires_at: Set(expires_at.into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

/// Finds a session by its opaque id (the cookie value).
pub async fn find_by_id(db: &DatabaseConnection, id: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Replaces the stored access token after a refresh.
///
/// `expires_at` is written in the same UPDATE as the token so a concurrent
/// reader never sees a fresh token paired with a stale expiry. When the
/// authorization server did not reissue a refresh token (`new_refresh_token`
/// is `None`) the previously stored one is kept.
pub async fn update_tokens(
    db: &DatabaseConnection,
    id: &str,
    access_token: String,
    new_refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
) -> Result<Model, Error> {
    let existing = Entity::find_by_id(id).one(db).await?.ok_or(Error {
        source: None,
        error_kind: super::error::EntityApiErrorKind::RecordNotFound,
    })?;

    debug!("Updating session tokens: {id}");

    let refresh_token = match new_refresh_token {
        Some(token) => Set(Some(token)),
        None => Unchanged(existing.oauth_refresh_token.clone()),
    };

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        user_id: Unchanged(existing.user_id),
        oauth_access_token: Set(access_token),
        oauth_refresh_token: refresh_token,
        expires_at: Set(expires_at.into()),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?)
}

/// Deletes a session by id (logout). Deleting an id that no longer exists
/// is not an error.
pub async fn delete_by_id(db: &DatabaseConnection, id: &str) -> Result<(), Error> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Deletes every session whose access token expired before `now`.
///
/// Returns the number of rows removed. A swept session forces a new login
/// on next use.
pub async fn delete_expired(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Counts all session rows.
pub async fn count(db: &DatabaseConnection) -> Result<u64, Error> {
    Ok(Entity::find().count(db).await?)
}
