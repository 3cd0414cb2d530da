use chrono::{DateTime, Utc};

use crate::{errors::AppError, secret_token::SecretToken, service_provider::slack::TokenGrant};

pub const WORKSPACE_INSTALLS_TABLE: &str = "workspace_installs";

/// Upsert input, one per successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceInstall {
    pub team_id: String,
    pub team_name: String,
    pub bot_token: SecretToken,
    pub bot_user_id: String,
    pub app_id: String,
    pub scopes: String,
}

impl WorkspaceInstall {
    pub fn from_grant(grant: &TokenGrant) -> Result<WorkspaceInstall, AppError> {
        let team_id = grant.team_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::PersistenceError("grant has no team id".to_string()))?;
        let bot_token = grant.access_token.clone()
            .ok_or_else(|| AppError::PersistenceError(format!("grant for team {} has no access token", team_id)))?;

        Ok(WorkspaceInstall {
            team_id: team_id.to_string(),
            team_name: grant.team_name().unwrap_or_default().to_string(),
            bot_token,
            bot_user_id: grant.bot_user_id.clone().unwrap_or_default(),
            app_id: grant.app_id.clone().unwrap_or_default(),
            scopes: grant.scope.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceRecord {
    pub team_id: String, // Partition Key
    pub team_name: String,
    pub bot_token: SecretToken,
    pub bot_user_id: String,
    pub app_id: String,
    pub scopes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceRecord {
    pub fn from_install(install: &WorkspaceInstall, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> WorkspaceRecord {
        WorkspaceRecord {
            team_id: install.team_id.clone(),
            team_name: install.team_name.clone(),
            bot_token: install.bot_token.clone(),
            bot_user_id: install.bot_user_id.clone(),
            app_id: install.app_id.clone(),
            scopes: install.scopes.clone(),
            created_at,
            updated_at,
        }
    }
}
