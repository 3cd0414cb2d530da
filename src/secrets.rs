use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use serde_derive::{Serialize, Deserialize};
use tracing::info;

use crate::errors::AppError;

#[derive(Serialize, Deserialize, Default)]
pub struct Secrets {
    #[serde(default)]
    pub slack_client_id: Option<String>,
    #[serde(default)]
    pub slack_client_secret: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

pub struct SecretsClient {
    client: Client,
}

impl SecretsClient {
    pub fn new(config: &SdkConfig) -> SecretsClient {
        SecretsClient{ client: Client::new(config) }
    }

    pub async fn get_secret(&self, name: &str) -> Result<Secrets, AppError> {
        info!(secret_name = name, "Querying secret value");

        let result = self.client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await?;

        let secret_string = result.secret_string()
            .ok_or_else(|| AppError::ConfigurationError(format!("Secret {} has no string value", name)))?;

        parse_secrets(secret_string)
    }
}

pub fn parse_secrets(secret_string: &str) -> Result<Secrets, AppError> {
    Ok(serde_json::from_str(secret_string)?)
}
