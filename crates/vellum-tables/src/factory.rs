//! Factory for creating table backends.

use std::sync::Arc;

use vellum_core::backend::MemoryTable;
use vellum_core::error::{VellumError, VellumResult};
use vellum_core::traits::{TableBackend, TableConfig, TableProvider};

/// Factory for creating table backends.
pub struct TableFactory;

impl TableFactory {
    /// Create a table backend from the given configuration.
    pub async fn create(config: &TableConfig) -> VellumResult<Arc<dyn TableBackend>> {
        tracing::debug!(provider = ?config.provider, table = %config.table_name, "creating table backend");

        match config.provider {
            TableProvider::Memory => Ok(Arc::new(MemoryTable::new(config.table_name.as_str()))),

            #[cfg(feature = "sqlite")]
            TableProvider::Sqlite => {
                let table = match config.option_str("path") {
                    Some(path) => crate::sqlite::SqliteTable::new(path, &config.table_name)?,
                    None => crate::sqlite::SqliteTable::in_memory(&config.table_name)?,
                };
                Ok(Arc::new(table))
            }

            #[cfg(feature = "dynamodb")]
            TableProvider::DynamoDb => {
                let table = crate::dynamodb::DynamoDbTable::new(
                    &config.table_name,
                    config.option_str("region"),
                    config.option_str("endpoint_url"),
                )
                .await?;
                Ok(Arc::new(table))
            }

            #[allow(unreachable_patterns)]
            provider => Err(VellumError::UnsupportedBackend {
                backend: format!("{:?} (enable the matching vellum-tables feature)", provider),
            }),
        }
    }

    /// Create a process-local table.
    pub fn memory(table_name: &str) -> Arc<dyn TableBackend> {
        Arc::new(MemoryTable::new(table_name))
    }

    /// Create a SQLite table at `path`.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &str, table_name: &str) -> VellumResult<Arc<dyn TableBackend>> {
        Ok(Arc::new(crate::sqlite::SqliteTable::new(path, table_name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_memory_table() {
        let table = TableFactory::create(&TableConfig::default()).await.unwrap();
        assert_eq!(table.table_name(), "vellum");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_create_sqlite_table() {
        let config = TableConfig {
            provider: TableProvider::Sqlite,
            table_name: "agreements".to_string(),
            config: json!({}),
        };
        let table = TableFactory::create(&config).await.unwrap();
        assert_eq!(table.table_name(), "agreements");
    }

    #[cfg(not(feature = "dynamodb"))]
    #[tokio::test]
    async fn test_disabled_provider_is_unsupported() {
        let config = TableConfig {
            provider: TableProvider::DynamoDb,
            config: json!({"region": "us-east-1"}),
            ..TableConfig::default()
        };
        let err = TableFactory::create(&config).await.err().unwrap();
        assert!(matches!(err, VellumError::UnsupportedBackend { .. }));
    }
}
