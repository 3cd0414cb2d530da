use std::sync::Arc;

use tracing::{error, info};

use crate::{config::Config, encryption::Encryption, errors::AppError};

use super::{DynamoDbWorkspaceStore, MemoryWorkspaceStore, NoopWorkspaceStore, PostgresWorkspaceStore, WorkspaceStore, WORKSPACE_INSTALLS_TABLE};

/// Backend named by `STORAGE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Noop,
    Memory,
    Postgres(String),
    DynamoDb { table_name: String },
}

impl StorageTarget {
    pub fn parse(storage_url: Option<&str>) -> Result<StorageTarget, AppError> {
        let url = match storage_url.map(str::trim) {
            None | Some("") => return Ok(StorageTarget::Noop),
            Some(url) => url,
        };

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(StorageTarget::Postgres(url.to_string()));
        }

        if let Some(table) = url.strip_prefix("dynamodb://") {
            let table_name = match table.trim_matches('/') {
                "" => WORKSPACE_INSTALLS_TABLE.to_string(),
                table => table.to_string(),
            };
            return Ok(StorageTarget::DynamoDb { table_name });
        }

        if url == "memory://" || url == "memory" {
            return Ok(StorageTarget::Memory);
        }

        let scheme = url.split("://").next().unwrap_or(url);
        Err(AppError::ConfigurationError(format!("Unsupported storage scheme: {}", scheme)))
    }
}

fn token_encryption(config: &Config) -> Result<Encryption, AppError> {
    let key = config.token_encryption_key.as_deref()
        .ok_or_else(|| AppError::ConfigurationError("TOKEN_ENCRYPTION_KEY is required for durable storage".to_string()))?;

    Encryption::with(key)
}

pub async fn build_workspace_store(config: &Config) -> Result<Arc<dyn WorkspaceStore>, AppError> {
    let store: Arc<dyn WorkspaceStore> = match StorageTarget::parse(config.storage_url.as_deref())? {
        StorageTarget::Noop => Arc::new(NoopWorkspaceStore),
        StorageTarget::Memory => Arc::new(MemoryWorkspaceStore::new()),
        StorageTarget::Postgres(url) => Arc::new(PostgresWorkspaceStore::connect_lazy(&url, token_encryption(config)?)?),
        StorageTarget::DynamoDb { table_name } => {
            let encryption = token_encryption(config)?;
            let aws_config = ::aws_config::load_from_env().await;
            Arc::new(DynamoDbWorkspaceStore::new(&aws_config, table_name, encryption))
        },
    };

    info!(backend = store.backend_name(), "Workspace store ready");
    Ok(store)
}

/// A broken storage setup must not block installs, so it degrades to the no-op store.
pub async fn build_workspace_store_or_noop(config: &Config) -> Arc<dyn WorkspaceStore> {
    match build_workspace_store(config).await {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "Failed to configure workspace store, installations will not be persisted");
            Arc::new(NoopWorkspaceStore)
        }
    }
}
