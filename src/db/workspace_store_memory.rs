use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::AppError;

use super::{WorkspaceInstall, WorkspaceRecord, WorkspaceStore};

/// Process-local store for local runs and tests. Contents vanish with the process.
#[derive(Clone, Default)]
pub struct MemoryWorkspaceStore {
    records: Arc<RwLock<HashMap<String, WorkspaceRecord>>>,
}

impl MemoryWorkspaceStore {
    pub fn new() -> MemoryWorkspaceStore {
        MemoryWorkspaceStore::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WorkspaceStore for MemoryWorkspaceStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert_workspace(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        let now = Utc::now();
        let mut records = self.records.write().await;

        let created_at = records.get(&install.team_id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let record = WorkspaceRecord::from_install(install, created_at, now);
        records.insert(install.team_id.clone(), record.clone());

        debug!(team_id = %install.team_id, "Upserted workspace in memory");
        Ok(record)
    }

    async fn get_workspace(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        Ok(self.records.read().await.get(team_id).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Selected when no storage is configured; installs still succeed, nothing is kept.
#[derive(Clone, Copy, Default)]
pub struct NoopWorkspaceStore;

#[async_trait]
impl WorkspaceStore for NoopWorkspaceStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert_workspace(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        info!(team_id = %install.team_id, "No storage configured, workspace installation not persisted");
        let now = Utc::now();
        Ok(WorkspaceRecord::from_install(install, now, now))
    }

    async fn get_workspace(&self, _team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{db::{MemoryWorkspaceStore, NoopWorkspaceStore, WorkspaceInstall, WorkspaceStore}, secret_token::SecretToken};

    fn install(team_id: &str, team_name: &str, bot_token: &str) -> WorkspaceInstall {
        WorkspaceInstall {
            team_id: team_id.to_string(),
            team_name: team_name.to_string(),
            bot_token: SecretToken::new(bot_token),
            bot_user_id: "U1".to_string(),
            app_id: "A1".to_string(),
            scopes: "chat:write".to_string(),
        }
    }

    #[tokio::test]
    async fn reinstall_updates_in_place_and_keeps_created_at() {
        let store = MemoryWorkspaceStore::new();

        let first = store.upsert_workspace(&install("T1", "Acme", "xoxb-first")).await.expect("first upsert");
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.upsert_workspace(&install("T1", "Acme Corp", "xoxb-second")).await.expect("second upsert");

        assert_eq!(store.len().await, 1);
        let stored = store.get_workspace("T1").await.expect("read").expect("record exists");
        assert_eq!(stored.bot_token.expose(), "xoxb-second");
        assert_eq!(stored.team_name, "Acme Corp");
        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.updated_at, second.updated_at);
        assert!(stored.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn different_teams_get_separate_records() {
        let store = MemoryWorkspaceStore::new();

        let acme = install("T1", "Acme", "xoxb-a");
        let globex = install("T2", "Globex", "xoxb-b");

        let (a, b) = tokio::join!(
            store.upsert_workspace(&acme),
            store.upsert_workspace(&globex),
        );
        a.expect("T1 upsert");
        b.expect("T2 upsert");

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get_workspace("T2").await.expect("read").map(|r| r.team_name), Some("Globex".to_string()));
    }

    #[tokio::test]
    async fn concurrent_reinstall_of_same_team_leaves_one_record() {
        let store = MemoryWorkspaceStore::new();
        let first = install("T1", "Acme", "xoxb-first");
        let second = install("T1", "Acme", "xoxb-second");

        let (a, b) = tokio::join!(
            store.upsert_workspace(&first),
            store.upsert_workspace(&second),
        );
        let a = a.expect("first upsert");
        let b = b.expect("second upsert");

        assert_eq!(store.len().await, 1);
        assert_eq!(a.created_at, b.created_at);

        let stored = store.get_workspace("T1").await.expect("read").expect("record exists");
        assert!(["xoxb-first", "xoxb-second"].contains(&stored.bot_token.expose()));
        assert_eq!(stored.created_at, a.created_at);
    }

    #[tokio::test]
    async fn noop_store_keeps_nothing() {
        let store = NoopWorkspaceStore;

        let record = store.upsert_workspace(&install("T1", "Acme", "xoxb-a")).await.expect("noop upsert");

        assert_eq!(record.team_id, "T1");
        assert!(store.get_workspace("T1").await.expect("read").is_none());
    }
}
