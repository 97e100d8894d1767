//! Assembly of the user payload returned to the browser after login and
//! from `/auth/me`.

use entity::{users, Id};
use log::warn;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::Error;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleSummary {
    pub id: Id,
    pub name: String,
}

/// The profile payload the browser receives. Never carries tokens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Option<RoleSummary>,
    pub role_name: Option<String>,
    pub organization_id: Option<Id>,
    pub organization_name: Option<String>,
}

/// Resolve role and organization names for a user.
///
/// Lookup failures degrade to `None` rather than failing the request; the
/// names are presentation data, not authorization inputs.
pub async fn assemble(db: &DatabaseConnection, user: &users::Model) -> Result<UserProfile, Error> {
    let role = match user.role_id {
        Some(role_id) => match entity_api::role::find_by_id(db, role_id).await {
            Ok(role) => role.map(|r| RoleSummary {
                id: r.id,
                name: r.role_name,
            }),
            Err(e) => {
                warn!("Could not fetch role for user {}: {e:?}", user.id);
                None
            }
        },
        None => None,
    };

    let organization_name = match user.organization_id {
        Some(organization_id) => {
            match entity_api::organization::find_by_id(db, organization_id).await {
                Ok(organization) => organization.map(|o| o.name),
                Err(e) => {
                    warn!("Could not fetch organization for user {}: {e:?}", user.id);
                    None
                }
            }
        }
        None => None,
    };

    let role_name = role.as_ref().map(|r| r.name.clone());

    Ok(UserProfile {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role,
        role_name,
        organization_id: user.organization_id,
        organization_name,
    })
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::{organizations, roles};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn user(role_id: Option<Id>, organization_id: Option<Id>) -> users::Model {
        let now = chrono::Utc::now();
        users::Model {
            id: Id::new_v4(),
            email: "writer@commonstories.org".to_string(),
            name: "Test Writer".to_string(),
            role_id,
            organization_id,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn assemble_resolves_role_and_organization_names() -> Result<(), Error> {
        let now = chrono::Utc::now();
        let role_id = Id::new_v4();
        let organization_id = Id::new_v4();
        let user = user(Some(role_id), Some(organization_id));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![roles::Model {
                id: role_id,
                role_name: "editor".to_string(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results(vec![vec![organizations::Model {
                id: organization_id,
                name: "Observatory".to_string(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let profile = assemble(&db, &user).await?;
        assert_eq!(profile.role_name.as_deref(), Some("editor"));
        assert_eq!(profile.organization_name.as_deref(), Some("Observatory"));
        Ok(())
    }

    #[tokio::test]
    async fn assemble_tolerates_missing_role_and_organization() -> Result<(), Error> {
        let user = user(None, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let profile = assemble(&db, &user).await?;
        assert!(profile.role.is_none());
        assert!(profile.organization_name.is_none());
        Ok(())
    }
}
