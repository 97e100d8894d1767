use super::error::Error;
use entity::users::{Column, Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, DatabaseConnection};

/// Finds a user by primary key. `None` when the user has been deleted;
/// callers decide whether that is an error.
pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

/// Finds a user by the email reported by the identity server's userinfo
/// endpoint.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await?)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_model() -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Id::new_v4(),
            email: "writer@commonstories.org".to_string(),
            name: "Test Writer".to_string(),
            role_id: Some(Id::new_v4()),
            organization_id: None,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_by_email_returns_model_when_found() -> Result<(), Error> {
        let model = test_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![model.clone()]])
            .into_connection();

        let result = find_by_email(&db, &model.email).await?;
        assert_eq!(result.unwrap().id, model.id);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_deleted_user() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results::<Model, Vec<Model>, _>(vec![vec![]])
            .into_connection();

        let result = find_by_id(&db, Id::new_v4()).await?;
        assert!(result.is_none());
        Ok(())
    }
}
