pub mod dynamodb_client;
mod factory;
mod workspace_record;
mod workspace_store;
mod workspace_store_dynamodb;
mod workspace_store_memory;
mod workspace_store_postgres;

#[cfg(test)]
mod workspace_store_postgres_test;

pub use factory::{build_workspace_store, build_workspace_store_or_noop, StorageTarget};
pub use workspace_record::{WorkspaceInstall, WorkspaceRecord, WORKSPACE_INSTALLS_TABLE};
pub use workspace_store::WorkspaceStore;
pub use workspace_store_dynamodb::DynamoDbWorkspaceStore;
pub use workspace_store_memory::{MemoryWorkspaceStore, NoopWorkspaceStore};
pub use workspace_store_postgres::PostgresWorkspaceStore;
