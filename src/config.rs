use std::env;

use tracing::{error, info};

use crate::{errors::AppError, secrets::{Secrets, SecretsClient}};

pub const DEFAULT_SLACK_OAUTH_ACCESS_URL: &str = "https://slack.com/api/oauth.v2.access";

#[derive(Clone)]
pub struct Config {
    pub slack_client_id: Option<String>,
    pub slack_client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub slack_oauth_access_url: String,

    pub storage_url: Option<String>,
    pub token_encryption_key: Option<String>,
    pub webhook_url: Option<String>,

    pub secrets_name: Option<String>,
}

/// Credentials for a single code exchange, only available once the config passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Environment first, then the secrets manager entry named by `SECRETS_NAME` for anything missing.
    /// An unreadable secret is logged; requests will then fail the credential check instead.
    pub async fn load() -> Config {
        let config = Config::from_env();

        let Some(secrets_name) = config.secrets_name.clone() else {
            return config;
        };

        let aws_config = ::aws_config::load_from_env().await;
        match SecretsClient::new(&aws_config).get_secret(&secrets_name).await {
            Ok(secrets) => {
                info!(secret_name = %secrets_name, "Loaded settings from secrets manager");
                config.with_secrets(secrets)
            },
            Err(err) => {
                error!(secret_name = %secrets_name, error = %err, "Failed to load secrets");
                config
            }
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let redirect_uri = get("SLACK_REDIRECT_URI")
            .or_else(|| get("URL").map(|site| format!("{}/callback", site.trim_end_matches('/'))));

        Config {
            slack_client_id: get("SLACK_CLIENT_ID"),
            slack_client_secret: get("SLACK_CLIENT_SECRET"),
            redirect_uri,
            slack_oauth_access_url: get("SLACK_OAUTH_ACCESS_URL").unwrap_or_else(|| DEFAULT_SLACK_OAUTH_ACCESS_URL.to_string()),

            storage_url: get("STORAGE_URL").or_else(|| get("DATABASE_URL")),
            token_encryption_key: get("TOKEN_ENCRYPTION_KEY"),
            webhook_url: get("INSTALL_WEBHOOK_URL").or_else(|| get("MAKE_WEBHOOK_URL")),

            secrets_name: get("SECRETS_NAME"),
        }
    }

    /// Fills settings not provided by the environment from a secrets manager entry.
    pub fn with_secrets(mut self, secrets: Secrets) -> Config {
        self.slack_client_id = self.slack_client_id.or(secrets.slack_client_id);
        self.slack_client_secret = self.slack_client_secret.or(secrets.slack_client_secret);
        self.token_encryption_key = self.token_encryption_key.or(secrets.encryption_key);
        self
    }

    pub fn exchange_credentials(&self) -> Result<ExchangeCredentials, AppError> {
        let client_id = self.slack_client_id.clone()
            .ok_or_else(|| AppError::ConfigurationError("SLACK_CLIENT_ID is not set".to_string()))?;
        let client_secret = self.slack_client_secret.clone()
            .ok_or_else(|| AppError::ConfigurationError("SLACK_CLIENT_SECRET is not set".to_string()))?;

        Ok(ExchangeCredentials {
            client_id,
            client_secret,
            redirect_uri: self.redirect_uri.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use crate::{config::{Config, DEFAULT_SLACK_OAUTH_ACCESS_URL}, errors::AppError, secrets::Secrets};

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn redirect_uri_defaults_to_site_callback() {
        let config = config_from(&[("URL", "https://installer.example.com/")]);

        assert_eq!(config.redirect_uri.as_deref(), Some("https://installer.example.com/callback"));
        assert_eq!(config.slack_oauth_access_url, DEFAULT_SLACK_OAUTH_ACCESS_URL);
    }

    #[test]
    fn explicit_redirect_uri_wins() {
        let config = config_from(&[
            ("URL", "https://installer.example.com"),
            ("SLACK_REDIRECT_URI", "https://other.example.com/slack/callback"),
        ]);

        assert_eq!(config.redirect_uri.as_deref(), Some("https://other.example.com/slack/callback"));
    }

    #[test]
    fn missing_client_secret_is_a_configuration_error() {
        let config = config_from(&[("SLACK_CLIENT_ID", "123.456")]);

        match config.exchange_credentials() {
            Err(AppError::ConfigurationError(message)) => assert!(message.contains("SLACK_CLIENT_SECRET")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = config_from(&[("SLACK_CLIENT_ID", "  "), ("SLACK_CLIENT_SECRET", "secret")]);

        assert!(config.slack_client_id.is_none());
        assert!(config.exchange_credentials().is_err());
    }

    #[test]
    fn storage_and_webhook_aliases() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/installs"),
            ("MAKE_WEBHOOK_URL", "https://hook.example.com/abc"),
        ]);

        assert_eq!(config.storage_url.as_deref(), Some("postgres://localhost/installs"));
        assert_eq!(config.webhook_url.as_deref(), Some("https://hook.example.com/abc"));
    }

    #[test]
    fn secrets_only_fill_gaps() {
        let config = config_from(&[("SLACK_CLIENT_ID", "from-env")]).with_secrets(Secrets {
            slack_client_id: Some("from-secrets".to_string()),
            slack_client_secret: Some("secret".to_string()),
            encryption_key: None,
        });

        let credentials = config.exchange_credentials().expect("credentials should be complete");
        assert_eq!(credentials.client_id, "from-env");
        assert_eq!(credentials.client_secret, "secret");
    }

    #[test]
    #[serial]
    fn reads_process_environment() {
        std::env::set_var("SLACK_CLIENT_ID", "env-client");
        std::env::set_var("SLACK_CLIENT_SECRET", "env-secret");

        let config = Config::from_env();

        std::env::remove_var("SLACK_CLIENT_ID");
        std::env::remove_var("SLACK_CLIENT_SECRET");

        let credentials = config.exchange_credentials().expect("credentials from env");
        assert_eq!(credentials.client_id, "env-client");
        assert_eq!(credentials.client_secret, "env-secret");
    }
}
