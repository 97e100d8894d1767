use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sessions for the BFF login bridge. The primary key is the opaque
        // cookie value; tokens are encrypted at the application layer via
        // identity_auth::encryption (AES-256-GCM). expires_at always
        // reflects the currently stored access token.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS common_stories.sessions (
                    id VARCHAR(64) PRIMARY KEY,
                    user_id UUID NOT NULL REFERENCES common_stories.users(id) ON DELETE CASCADE,
                    oauth_access_token TEXT NOT NULL,
                    oauth_refresh_token TEXT,
                    expires_at TIMESTAMPTZ NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
            "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_sessions_user_id
                 ON common_stories.sessions(user_id)",
            )
            .await?;

        // The expired-session sweeper deletes by expiry
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at
                 ON common_stories.sessions(expires_at)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS common_stories.sessions")
            .await?;

        Ok(())
    }
}
