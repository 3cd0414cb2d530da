use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::{PgPoolOptions, PgRow}, PgPool, Row};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{encryption::Encryption, errors::AppError, secret_token::SecretToken};

use super::{WorkspaceInstall, WorkspaceRecord, WorkspaceStore};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS workspace_installs (
        team_id TEXT PRIMARY KEY,
        team_name TEXT NOT NULL,
        bot_token TEXT NOT NULL,
        bot_user_id TEXT NOT NULL,
        app_id TEXT NOT NULL,
        scopes TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

const UPSERT_SQL: &str = r"
    INSERT INTO workspace_installs (team_id, team_name, bot_token, bot_user_id, app_id, scopes, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
    ON CONFLICT (team_id) DO UPDATE SET
        team_name = EXCLUDED.team_name,
        bot_token = EXCLUDED.bot_token,
        bot_user_id = EXCLUDED.bot_user_id,
        app_id = EXCLUDED.app_id,
        scopes = EXCLUDED.scopes,
        updated_at = EXCLUDED.updated_at
    RETURNING created_at, updated_at
";

const SELECT_SQL: &str = r"
    SELECT team_id, team_name, bot_token, bot_user_id, app_id, scopes, created_at, updated_at
    FROM workspace_installs
    WHERE team_id = $1
";

pub struct PostgresWorkspaceStore {
    pool: PgPool,
    encryption: Encryption,
    schema_ready: OnceCell<()>,
}

impl PostgresWorkspaceStore {
    /// Nothing is dialed until the first query, so a database outage never blocks startup.
    pub fn connect_lazy(database_url: &str, encryption: Encryption) -> Result<PostgresWorkspaceStore, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(database_url)?;

        Ok(PostgresWorkspaceStore { pool, encryption, schema_ready: OnceCell::new() })
    }

    fn to_record(&self, row: &PgRow) -> Result<WorkspaceRecord, AppError> {
        let team_id: String = row.try_get("team_id")?;
        let sealed_token: String = row.try_get("bot_token")?;
        let bot_token = self.encryption.open(&sealed_token)
            .map_err(|err| AppError::PersistenceError(format!("Couldn't decrypt bot token for team {}: {}", team_id, err)))?;

        Ok(WorkspaceRecord {
            team_name: row.try_get("team_name")?,
            bot_token: SecretToken::new(bot_token),
            bot_user_id: row.try_get("bot_user_id")?,
            app_id: row.try_get("app_id")?,
            scopes: row.try_get("scopes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            team_id,
        })
    }

    async fn create_table(&self) -> Result<(), AppError> {
        info!("Ensuring workspace_installs table exists");
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        self.schema_ready.get_or_try_init(|| self.create_table()).await?;

        let sealed_token = self.encryption.seal(install.bot_token.expose())?;

        // Returned to the pool when dropped, whichever way this function exits.
        let mut connection = self.pool.acquire().await?;

        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(UPSERT_SQL)
            .bind(&install.team_id)
            .bind(&install.team_name)
            .bind(sealed_token)
            .bind(&install.bot_user_id)
            .bind(&install.app_id)
            .bind(&install.scopes)
            .bind(Utc::now())
            .fetch_one(&mut *connection)
            .await?;

        debug!(team_id = %install.team_id, "Upserted workspace installation in Postgres");
        Ok(WorkspaceRecord::from_install(install, created_at, updated_at))
    }

    async fn fetch(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        let row = sqlx::query(SELECT_SQL)
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(|row| self.to_record(row)).transpose()
    }
}

#[async_trait]
impl WorkspaceStore for PostgresWorkspaceStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        self.create_table().await.map_err(AppError::into_persistence)
    }

    async fn upsert_workspace(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        self.upsert(install).await.map_err(AppError::into_persistence)
    }

    async fn get_workspace(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        self.fetch(team_id).await.map_err(AppError::into_persistence)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
