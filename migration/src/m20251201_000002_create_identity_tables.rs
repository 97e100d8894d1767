use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS common_stories.roles (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    role_name VARCHAR(100) NOT NULL UNIQUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS common_stories.organizations (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    name VARCHAR(255) NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS common_stories.users (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    email VARCHAR(255) NOT NULL UNIQUE,
                    name VARCHAR(255) NOT NULL,
                    role_id UUID REFERENCES common_stories.roles(id) ON DELETE SET NULL,
                    organization_id UUID REFERENCES common_stories.organizations(id) ON DELETE SET NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_users_email ON common_stories.users(email)",
            )
            .await?;

        // Base roles; accounts are provisioned by administrators, so the
        // role set must exist before the first OAuth login.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                INSERT INTO common_stories.roles (role_name)
                VALUES ('admin'), ('editor'), ('writer')
                ON CONFLICT (role_name) DO NOTHING
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS common_stories.users")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS common_stories.organizations")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS common_stories.roles")
            .await?;

        Ok(())
    }
}
