use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{client::Waiters, types::{AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, ReturnValue, ScalarAttributeType}, Client};
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{encryption::Encryption, errors::AppError, secret_token::SecretToken};
use super::dynamodb_client::{get_attribute, get_timestamp_attribute};

use super::{WorkspaceInstall, WorkspaceRecord, WorkspaceStore};

const TABLE_CREATION_TIMEOUT: Duration = Duration::from_secs(60);

// created_at is only written when the item is new, so reinstalls keep the first install time.
const UPSERT_EXPRESSION: &str = "SET team_name = :team_name, bot_token = :bot_token, bot_user_id = :bot_user_id, \
    app_id = :app_id, scopes = :scopes, updated_at = :now, created_at = if_not_exists(created_at, :now)";

pub struct DynamoDbWorkspaceStore {
    client: Client,
    table_name: String,
    encryption: Encryption,
    schema_ready: OnceCell<()>,
}

impl DynamoDbWorkspaceStore {
    pub fn new(config: &SdkConfig, table_name: String, encryption: Encryption) -> DynamoDbWorkspaceStore {
        DynamoDbWorkspaceStore { client: Client::new(config), table_name, encryption, schema_ready: OnceCell::new() }
    }

    fn to_record(&self, item: &HashMap<String, AttributeValue>) -> Result<WorkspaceRecord, AppError> {
        let team_id = get_attribute(item, "team_id")?;
        let bot_token = self.encryption.open(&get_attribute(item, "bot_token")?)
            .map_err(|err| AppError::PersistenceError(format!("Couldn't decrypt bot token for team {}: {}", team_id, err)))?;

        Ok(WorkspaceRecord {
            team_name: get_attribute(item, "team_name")?,
            bot_token: SecretToken::new(bot_token),
            bot_user_id: get_attribute(item, "bot_user_id")?,
            app_id: get_attribute(item, "app_id")?,
            scopes: get_attribute(item, "scopes")?,
            created_at: get_timestamp_attribute(item, "created_at")?,
            updated_at: get_timestamp_attribute(item, "updated_at")?,
            team_id,
        })
    }
}

fn build_error(err: aws_sdk_dynamodb::error::BuildError) -> AppError {
    AppError::UnexpectedError(err.to_string())
}

impl DynamoDbWorkspaceStore {
    async fn create_table_if_missing(&self) -> Result<(), AppError> {
        match self.client.describe_table().table_name(&self.table_name).send().await {
            Ok(_) => return Ok(()),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_resource_not_found_exception()) => {},
            Err(err) => return Err(err.into()),
        }

        info!(table_name = %self.table_name, "Creating DynamoDB table for workspace installations");
        let created = self.client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(KeySchemaElement::builder().attribute_name("team_id").key_type(KeyType::Hash).build().map_err(build_error)?)
            .attribute_definitions(AttributeDefinition::builder().attribute_name("team_id").attribute_type(ScalarAttributeType::S).build().map_err(build_error)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match created {
            Ok(_) => {},
            // another invocation got there first
            Err(err) if err.as_service_error().is_some_and(|e| e.is_resource_in_use_exception()) => {},
            Err(err) => return Err(err.into()),
        }

        self.client
            .wait_until_table_exists()
            .table_name(&self.table_name)
            .wait(TABLE_CREATION_TIMEOUT)
            .await
            .map_err(|err| AppError::PersistenceError(format!("Table {} did not become active: {}", self.table_name, err)))?;

        Ok(())
    }

    async fn upsert(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        self.schema_ready.get_or_try_init(|| self.create_table_if_missing()).await?;

        let now = Utc::now().to_rfc3339();
        let sealed_token = self.encryption.seal(install.bot_token.expose())?;

        let request = self.client
            .update_item()
            .table_name(&self.table_name)
            .key("team_id", AttributeValue::S(install.team_id.clone()))
            .update_expression(UPSERT_EXPRESSION)
            .expression_attribute_values(":team_name", AttributeValue::S(install.team_name.clone()))
            .expression_attribute_values(":bot_token", AttributeValue::S(sealed_token))
            .expression_attribute_values(":bot_user_id", AttributeValue::S(install.bot_user_id.clone()))
            .expression_attribute_values(":app_id", AttributeValue::S(install.app_id.clone()))
            .expression_attribute_values(":scopes", AttributeValue::S(install.scopes.clone()))
            .expression_attribute_values(":now", AttributeValue::S(now))
            .return_values(ReturnValue::AllNew)
        ;

        debug!(team_id = %install.team_id, table_name = %self.table_name, "Save workspace installation to DynamoDB");
        let output = request.send().await?;

        let attributes = output.attributes()
            .ok_or_else(|| AppError::PersistenceError("update_item returned no attributes".to_string()))?;

        Ok(WorkspaceRecord::from_install(
            install,
            get_timestamp_attribute(attributes, "created_at")?,
            get_timestamp_attribute(attributes, "updated_at")?,
        ))
    }

    async fn fetch(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        let output = self.client
            .get_item()
            .table_name(&self.table_name)
            .key("team_id", AttributeValue::S(team_id.to_string()))
            .consistent_read(true)
            .send()
            .await?;

        output.item().map(|item| self.to_record(item)).transpose()
    }
}

#[async_trait]
impl WorkspaceStore for DynamoDbWorkspaceStore {
    async fn ensure_schema(&self) -> Result<(), AppError> {
        self.create_table_if_missing().await.map_err(AppError::into_persistence)
    }

    async fn upsert_workspace(&self, install: &WorkspaceInstall) -> Result<WorkspaceRecord, AppError> {
        self.upsert(install).await.map_err(AppError::into_persistence)
    }

    async fn get_workspace(&self, team_id: &str) -> Result<Option<WorkspaceRecord>, AppError> {
        self.fetch(team_id).await.map_err(AppError::into_persistence)
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}
