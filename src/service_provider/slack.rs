use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_derive::Deserialize;
use tracing::{info, warn};

use crate::{config::ExchangeCredentials, errors::AppError, secret_token::SecretToken};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SlackTeam {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Enterprise {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthedUser {
    pub id: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub access_token: Option<SecretToken>,
}

/// Response of `oauth.v2.access`. Every field is optional on the wire; a missing `ok` reads as a rejection.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenGrant {
    #[serde(default)]
    pub ok: bool,

    pub access_token: Option<SecretToken>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub bot_user_id: Option<String>,
    pub app_id: Option<String>,

    pub team: Option<SlackTeam>,
    pub enterprise: Option<Enterprise>,
    #[serde(default)]
    pub is_enterprise_install: bool,
    pub authed_user: Option<AuthedUser>,

    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenGrant {
    pub fn team_id(&self) -> Option<&str> {
        self.team.as_ref().and_then(|t| t.id.as_deref())
    }

    pub fn team_name(&self) -> Option<&str> {
        self.team.as_ref().and_then(|t| t.name.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub credentials: ExchangeCredentials,
    pub code: String,
}

#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Swaps a single-use authorization code for a bot token. Never retried.
    async fn exchange(&self, request: &ExchangeRequest) -> Result<TokenGrant, AppError>;
}

pub struct SlackTokenExchanger {
    http_client: Client,
    oauth_access_url: String,
}

impl SlackTokenExchanger {
    pub fn new(http_client: Client, oauth_access_url: String) -> SlackTokenExchanger {
        SlackTokenExchanger { http_client, oauth_access_url }
    }
}

pub fn encode_exchange_form(request: &ExchangeRequest) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("client_id", &request.credentials.client_id)
        .append_pair("client_secret", &request.credentials.client_secret)
        .append_pair("code", &request.code);

    if let Some(redirect_uri) = &request.credentials.redirect_uri {
        form.append_pair("redirect_uri", redirect_uri);
    }

    form.finish()
}

/// Turns the raw `oauth.v2.access` body into a grant, or the reason there isn't one.
pub fn parse_token_response(response_body: &str) -> Result<TokenGrant, AppError> {
    let grant: TokenGrant = serde_json::from_str(response_body)
        .map_err(|err| AppError::ResponseParseError(err.to_string()))?;

    if !grant.ok {
        let error = grant.error.unwrap_or_else(|| "OAuth failed".to_string());
        warn!(error = %error, "Slack rejected the authorization code");

        return Err(AppError::OAuthRejected { error, details: grant.error_description });
    }

    if grant.access_token.is_none() {
        return Err(AppError::ResponseParseError("ok response without access_token".to_string()));
    }

    Ok(grant)
}

#[async_trait]
impl TokenExchange for SlackTokenExchanger {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<TokenGrant, AppError> {
        info!(redirect_uri = ?request.credentials.redirect_uri, "Swap slack access token");

        let response = self.http_client
            .post(&self.oauth_access_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_exchange_form(request))
            .send()
            .await?;

        let status = response.status();
        let response_body = response.text().await?;
        info!(status = status.as_u16(), "Received response from Slack");

        if !status.is_success() {
            warn!(status = status.as_u16(), "Slack token endpoint answered with a non-success status");
        }

        parse_token_response(&response_body)
    }
}
