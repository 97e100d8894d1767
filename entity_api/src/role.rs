use super::error::Error;
use entity::roles::{Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, DatabaseConnection};

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}
