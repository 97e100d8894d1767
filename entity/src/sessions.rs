use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A server-side login session owned by a user.
///
/// The primary key doubles as the `session_id` cookie value handed to the
/// browser; it is the only credential the browser ever holds. The OAuth
/// token pair obtained from the authorization server is stored encrypted
/// and never serialized out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[sea_orm(schema_name = "common_stories", table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[schema(value_type = String, format = Uuid)]
    pub user_id: Id,
    #[serde(skip_serializing)]
    pub oauth_access_token: String,
    #[serde(skip_serializing)]
    pub oauth_refresh_token: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True once the stored access token's own expiry has passed.
    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.with_timezone(&chrono::Utc) <= now
    }
}
