//! Table backend trait and related types.
//!
//! The store talks to a single wide table through these DynamoDB-shaped
//! primitives. Backends know nothing about versioning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VellumResult;
use crate::types::{FieldMap, ItemKey};

/// One item of the wide table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableItem {
    /// Composite primary key.
    pub key: ItemKey,
    /// Remaining attributes, without the key attributes.
    pub body: FieldMap,
}

impl TableItem {
    pub fn new(key: ItemKey, body: FieldMap) -> Self {
        Self { key, body }
    }
}

/// Parameters of a filtered full-table scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// Only items whose partition key starts with this prefix.
    pub pk_prefix: Option<String>,
    /// Only items with exactly this sort key.
    pub sort_key: Option<String>,
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Resume after this key (exclusive).
    pub exclusive_start: Option<ItemKey>,
}

impl ScanRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pk_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.pk_prefix = Some(prefix.into());
        self
    }

    pub fn with_sort_key(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn starting_after(mut self, key: Option<ItemKey>) -> Self {
        self.exclusive_start = key;
        self
    }

    /// Whether an item passes the prefix and sort-key filters.
    pub fn matches(&self, key: &ItemKey) -> bool {
        let prefix_ok = self
            .pk_prefix
            .as_deref()
            .map_or(true, |prefix| key.pk.starts_with(prefix));
        let sort_ok = self.sort_key.as_deref().map_or(true, |sk| key.sk == sk);
        prefix_ok && sort_ok
    }
}

/// Result of one scan call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<TableItem>,
    /// Key to resume from; `None` when the table is exhausted.
    pub last_evaluated: Option<ItemKey>,
}

/// Core TableBackend trait - all wide-table backends implement this.
///
/// Implementations must be safe to share between tasks. No operation here is
/// conditional or transactional.
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Insert or replace an item.
    async fn put_item(&self, item: TableItem) -> VellumResult<()>;

    /// Fetch an item by its exact key.
    async fn get_item(&self, key: &ItemKey) -> VellumResult<Option<TableItem>>;

    /// Delete an item. Deleting a missing key is not an error.
    async fn delete_item(&self, key: &ItemKey) -> VellumResult<()>;

    /// Every item sharing a partition key, in no particular order.
    async fn query_partition(&self, pk: &str) -> VellumResult<Vec<TableItem>>;

    /// Full-table scan with client-visible filters and paging.
    async fn scan(&self, request: ScanRequest) -> VellumResult<ScanPage>;

    /// Name of the underlying table.
    fn table_name(&self) -> &str;
}

/// Table backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Provider type.
    pub provider: TableProvider,
    /// Table name.
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Provider-specific configuration (`path`, `endpoint_url`, `region`).
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_table_name() -> String {
    "vellum".to_string()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            provider: TableProvider::Memory,
            table_name: default_table_name(),
            config: serde_json::json!({}),
        }
    }
}

impl TableConfig {
    /// Get a provider-specific string option.
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.config.get(name).and_then(|v| v.as_str())
    }
}

/// Table backend provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableProvider {
    /// Process-local table, lost on exit.
    #[default]
    Memory,
    /// Single-file SQLite table.
    Sqlite,
    /// Amazon DynamoDB.
    #[serde(rename = "dynamodb")]
    DynamoDb,
}

impl std::str::FromStr for TableProvider {
    type Err = crate::error::VellumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "dynamodb" | "dynamo" => Ok(Self::DynamoDb),
            other => Err(crate::error::VellumError::UnsupportedBackend {
                backend: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_request_matches() {
        let request = ScanRequest::new()
            .with_pk_prefix("USER#")
            .with_sort_key("V0");

        assert!(request.matches(&ItemKey::new("USER#1", "V0")));
        assert!(!request.matches(&ItemKey::new("USER#1", "V1")));
        assert!(!request.matches(&ItemKey::new("AGREEMENT#1", "V0")));
        assert!(ScanRequest::new().matches(&ItemKey::new("ANY#x", "V3")));
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("SQLite".parse::<TableProvider>().unwrap(), TableProvider::Sqlite);
        assert_eq!("dynamodb".parse::<TableProvider>().unwrap(), TableProvider::DynamoDb);
        assert!("cassandra".parse::<TableProvider>().is_err());
    }

    #[test]
    fn test_table_config_deserializes_with_defaults() {
        let config: TableConfig =
            serde_json::from_str(r#"{"provider": "dynamodb", "config": {"region": "us-west-2"}}"#)
                .unwrap();
        assert_eq!(config.provider, TableProvider::DynamoDb);
        assert_eq!(config.table_name, "vellum");
        assert_eq!(config.option_str("region"), Some("us-west-2"));
    }
}
