use aws_sdk_dynamodb::{operation::{create_table::CreateTableError, describe_table::DescribeTableError, get_item::GetItemError, update_item::UpdateItemError}, error::SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use lambda_runtime::Diagnostic;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Method not allowed: `{0}`")]
    MethodNotAllowed(String),

    #[error("Invalid request: `{0}`")]
    RequestFormatError(String),

    #[error("Server configuration error: `{0}`")]
    ConfigurationError(String),

    #[error("Slack rejected the authorization code: `{error}`")]
    OAuthRejected {
        error: String,
        details: Option<String>,
    },

    #[error("Failed to send request: `{0:?}`")]
    TransportError(#[from] reqwest::Error),

    #[error("Failed to parse response: `{0}`")]
    ResponseParseError(String),

    #[error("Failed to persist workspace installation: `{0}`")]
    PersistenceError(String),

    #[error("Failed to deliver install notification: `{0}`")]
    NotificationError(String),

    #[error("Failed to decode base64, `{0:?}`")]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error("Failed to serialize/deserialize json: `{0:?}`")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: `{0:?}`")]
    SqlxError(#[from] sqlx::Error),

    #[error("Failed to describe DynamoDB table: `{0:?}`")]
    DynamoDBDescribeTableError(#[from] SdkError<DescribeTableError>),

    #[error("Failed to create DynamoDB table: `{0:?}`")]
    DynamoDBCreateTableError(#[from] SdkError<CreateTableError>),

    #[error("Failed to update item in DynamoDB: `{0:?}`")]
    DynamoDBUpdateItemError(#[from] SdkError<UpdateItemError>),

    #[error("Failed to get item from DynamoDB: `{0:?}`")]
    DynamoDBGetItemError(#[from] SdkError<GetItemError>),

    #[error("Failed to get secret value: `{0:?}`")]
    GetSecretValueError(#[from] SdkError<GetSecretValueError>),

    #[error("Failed to encrypt/decrypt: `{0:?}`")]
    Chacha20poly1305Error(#[from] chacha20poly1305::Error),

    #[error("Unexpected error: `{0:?}`")]
    UnexpectedError(String),
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::MethodNotAllowed(_) => 405,
            AppError::RequestFormatError(_) | AppError::OAuthRejected { .. } => 400,
            _ => 500,
        }
    }

    /// Folds driver, SDK and cipher failures into `PersistenceError` at the store boundary.
    pub fn into_persistence(self) -> AppError {
        match self {
            AppError::PersistenceError(_) => self,
            other => AppError::PersistenceError(other.to_string()),
        }
    }

    /// Body returned to the installing user. Internal details stay in the logs.
    pub fn response_body(&self) -> Value {
        match self {
            AppError::MethodNotAllowed(_) => json!({ "error": "Method not allowed" }),
            AppError::RequestFormatError(message) => json!({ "error": message }),
            AppError::ConfigurationError(_) => json!({ "error": "Server configuration error" }),
            AppError::OAuthRejected { error, details: Some(details) } => json!({ "error": error, "details": details }),
            AppError::OAuthRejected { error, details: None } => json!({ "error": error }),
            AppError::TransportError(_) => json!({ "error": "Request failed" }),
            AppError::ResponseParseError(_) => json!({ "error": "Failed to parse response" }),
            _ => json!({ "error": "Internal server error" }),
        }
    }
}

// required by Lambda Runtime crate
impl From<AppError> for Diagnostic {
    fn from(error: AppError) -> Diagnostic {
        Diagnostic {
            error_type: format!("{:?}", error),
            error_message: error.to_string(),
        }
    }
}
