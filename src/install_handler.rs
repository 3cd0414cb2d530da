use std::sync::Arc;

use aws_lambda_events::{event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse}, encodings::Body, http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method}};
use serde_derive::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::{
    base64::decode_body,
    build_http_client,
    config::Config,
    db::{build_workspace_store_or_noop, WorkspaceInstall, WorkspaceStore},
    errors::AppError,
    service_provider::{slack::{ExchangeRequest, SlackTokenExchanger, TokenExchange, TokenGrant}, webhook::{InstallEvent, InstallNotify, WebhookNotifier}},
};

const INVALID_REQUEST_BODY: &str = "Invalid request body";
const MISSING_AUTHORIZATION_CODE: &str = "Missing authorization code";

/// Fields read from the inbound JSON body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstallRequest {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn non_empty_string(body: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse_install_request(body: Option<&str>) -> Result<InstallRequest, AppError> {
    let invalid = || AppError::RequestFormatError(INVALID_REQUEST_BODY.to_string());

    let parsed: Value = serde_json::from_str(body.ok_or_else(invalid)?).map_err(|_| invalid())?;
    let object = parsed.as_object().ok_or_else(invalid)?;

    Ok(InstallRequest {
        code: non_empty_string(object, "code"),
        state: non_empty_string(object, "state"),
    })
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthedUserSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Success body. Holds no token by construction.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstallSuccess {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authed_user: Option<AuthedUserSummary>,
}

impl InstallSuccess {
    pub fn from_grant(grant: &TokenGrant) -> InstallSuccess {
        InstallSuccess {
            success: true,
            team_id: grant.team_id().map(str::to_string),
            team_name: grant.team_name().map(str::to_string),
            bot_user_id: grant.bot_user_id.clone(),
            scope: grant.scope.clone(),
            authed_user: grant.authed_user.as_ref().map(|user| AuthedUserSummary {
                id: user.id.clone(),
                scope: user.scope.clone(),
                token_type: user.token_type.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallResponse {
    pub status_code: u16,
    pub body: Value,
}

impl InstallResponse {
    fn from_error(err: &AppError) -> InstallResponse {
        InstallResponse { status_code: err.status_code(), body: err.response_body() }
    }
}

pub struct InstallationHandler {
    config: Config,
    exchanger: Arc<dyn TokenExchange>,
    store: Arc<dyn WorkspaceStore>,
    notifier: Option<Arc<dyn InstallNotify>>,
}

impl InstallationHandler {
    pub fn new(config: Config, exchanger: Arc<dyn TokenExchange>, store: Arc<dyn WorkspaceStore>, notifier: Option<Arc<dyn InstallNotify>>) -> InstallationHandler {
        InstallationHandler { config, exchanger, store, notifier }
    }

    /// Wires the Slack exchanger, the configured store and the optional webhook.
    pub async fn from_config(config: Config) -> Result<InstallationHandler, AppError> {
        let http_client = build_http_client()?;

        let exchanger = Arc::new(SlackTokenExchanger::new(http_client.clone(), config.slack_oauth_access_url.clone()));
        let store = build_workspace_store_or_noop(&config).await;
        let notifier = config.webhook_url.clone()
            .map(|url| Arc::new(WebhookNotifier::new(http_client, url)) as Arc<dyn InstallNotify>);

        Ok(InstallationHandler::new(config, exchanger, store, notifier))
    }

    pub async fn handle(&self, method: &Method, body: Option<&str>) -> InstallResponse {
        info!(method = %method, "Slack OAuth install request");

        match self.install(method, body).await {
            Ok(success) => InstallResponse {
                status_code: 200,
                body: serde_json::to_value(&success).unwrap_or_else(|_| json!({ "success": true })),
            },
            Err(err) => {
                let response = InstallResponse::from_error(&err);
                if response.status_code >= 500 {
                    error!(status = response.status_code, error = %err, "Slack OAuth install failed");
                } else {
                    warn!(status = response.status_code, error = %err, "Slack OAuth install rejected");
                }
                response
            }
        }
    }

    pub async fn handle_api_gateway(&self, request: ApiGatewayProxyRequest) -> ApiGatewayProxyResponse {
        let body = match (request.is_base64_encoded, request.body) {
            (true, Some(encoded)) if request.http_method == Method::POST => match decode_body(&encoded) {
                Ok(decoded) => Some(decoded),
                Err(err) => {
                    warn!(error = %err, "Failed to decode base64 request body");
                    let rejected = InstallResponse::from_error(&AppError::RequestFormatError(INVALID_REQUEST_BODY.to_string()));
                    return response(rejected.status_code.into(), rejected.body.to_string());
                }
            },
            (_, body) => body,
        };

        let result = self.handle(&request.http_method, body.as_deref()).await;
        response(result.status_code.into(), result.body.to_string())
    }

    async fn install(&self, method: &Method, body: Option<&str>) -> Result<InstallSuccess, AppError> {
        if method != Method::POST {
            return Err(AppError::MethodNotAllowed(method.to_string()));
        }

        let request = parse_install_request(body)?;
        let code = request.code
            .ok_or_else(|| AppError::RequestFormatError(MISSING_AUTHORIZATION_CODE.to_string()))?;

        // TODO: verify `state` against the value issued when the install link was generated.
        debug!(state_present = request.state.is_some(), "state parameter is not verified");

        let credentials = self.config.exchange_credentials()?;
        let grant = self.exchanger.exchange(&ExchangeRequest { credentials, code }).await?;

        info!(team_id = ?grant.team_id(), team_name = ?grant.team_name(), "OAuth successful for team");

        self.persist(&grant).await;
        self.notify(&grant).await;

        Ok(InstallSuccess::from_grant(&grant))
    }

    /// Failures are logged only; the workspace already authorized the app.
    async fn persist(&self, grant: &TokenGrant) {
        let result = match WorkspaceInstall::from_grant(grant) {
            Ok(install) => self.store.upsert_workspace(&install).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(record) => info!(team_id = %record.team_id, backend = self.store.backend_name(), created_at = %record.created_at, "Saved workspace installation"),
            Err(err) => error!(team_id = ?grant.team_id(), backend = self.store.backend_name(), error = %err, "Failed to save workspace installation, continuing"),
        }
    }

    async fn notify(&self, grant: &TokenGrant) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        if let Err(err) = notifier.notify(&InstallEvent::from_grant(grant)).await {
            warn!(team_id = ?grant.team_id(), error = %err, "Failed to send install notification, continuing");
        }
    }
}

pub fn response(status_code: i64, body: String) -> ApiGatewayProxyResponse {
    let mut response_headers = HeaderMap::new();
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    ApiGatewayProxyResponse {
        status_code,
        headers: response_headers,
        body: Some(Body::from(body)),
        ..Default::default()
    }
}
