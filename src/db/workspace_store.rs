use async_trait::async_trait;

use crate::errors::AppError;

use super::{WorkspaceInstall, WorkspaceRecord};

/// Durable home of workspace credentials, one record per `team_id`.
///
/// Implementations resolve racing installs for the same team through the backend's
/// own conflict handling, never with an application lock.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Creates the table if it does not exist yet. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<(), AppError>;

    /// Insert-or-update keyed by `team_id`. The newest call wins for every field except `created_at`.
    async fn upsert_workspace(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError>;

    async fn get_workspace(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError>;

    fn backend_name(&self) -> &'static str;
}
