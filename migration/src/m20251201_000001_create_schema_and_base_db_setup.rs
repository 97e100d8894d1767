use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the platform's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS common_stories;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO common_stories, public;")
            .await?;

        // Create the base DB user that will execute all platform queries
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL PRIVILEGES ON DATABASE commonstories TO commonstories;
                    GRANT ALL ON SCHEMA common_stories TO commonstories;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA common_stories GRANT ALL ON TABLES TO commonstories;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA common_stories GRANT ALL ON SEQUENCES TO commonstories;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA common_stories REVOKE ALL ON SEQUENCES FROM commonstories;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA common_stories REVOKE ALL ON TABLES FROM commonstories;
                    REVOKE ALL ON SCHEMA common_stories FROM commonstories;
                    REVOKE ALL PRIVILEGES ON DATABASE commonstories FROM commonstories;
                END $$;
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS common_stories CASCADE;")
            .await?;

        Ok(())
    }
}
