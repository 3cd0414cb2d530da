use async_trait::async_trait;
use reqwest::Client;
use serde_derive::Serialize;
use tracing::info;

use crate::{errors::AppError, service_provider::slack::TokenGrant};

pub const APP_INSTALLED: &str = "app_installed";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstallEvent {
    pub event: &'static str,
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub bot_user_id: Option<String>,
}

impl InstallEvent {
    pub fn from_grant(grant: &TokenGrant) -> InstallEvent {
        InstallEvent {
            event: APP_INSTALLED,
            team_id: grant.team_id().map(str::to_string),
            team_name: grant.team_name().map(str::to_string),
            bot_user_id: grant.bot_user_id.clone(),
        }
    }
}

#[async_trait]
pub trait InstallNotify: Send + Sync {
    /// Fire-and-forget; callers log the error and move on.
    async fn notify(&self, event: &InstallEvent) -> Result<(), AppError>;
}

pub struct WebhookNotifier {
    http_client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(http_client: Client, url: String) -> WebhookNotifier {
        WebhookNotifier { http_client, url }
    }
}

#[async_trait]
impl InstallNotify for WebhookNotifier {
    async fn notify(&self, event: &InstallEvent) -> Result<(), AppError> {
        let response = self.http_client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|err| AppError::NotificationError(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NotificationError(format!("webhook responded with status {}", status)));
        }

        info!(team_id = ?event.team_id, status = status.as_u16(), "Delivered install event");
        Ok(())
    }
}
