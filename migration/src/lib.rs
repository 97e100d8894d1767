pub use sea_orm_migration::prelude::*;

mod m20251201_000001_create_schema_and_base_db_setup;
mod m20251201_000002_create_identity_tables;
mod m20251211_000001_create_sessions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251201_000001_create_schema_and_base_db_setup::Migration),
            Box::new(m20251201_000002_create_identity_tables::Migration),
            Box::new(m20251211_000001_create_sessions_table::Migration),
        ]
    }
}
