//! Configuration system for vellum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{VellumError, VellumResult};
use crate::traits::{TableConfig, TableProvider};

/// Main store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VellumConfig {
    /// Table backend configuration.
    pub table: TableConfig,
    /// Default page size used when listing entities.
    pub page_size: usize,
}

impl Default for VellumConfig {
    fn default() -> Self {
        Self {
            table: TableConfig {
                provider: TableProvider::Sqlite,
                config: serde_json::json!({
                    "path": default_data_dir().join("vellum.db").to_string_lossy(),
                }),
                ..TableConfig::default()
            },
            page_size: 50,
        }
    }
}

/// `~/.vellum`, or `.vellum` when there is no home directory.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".vellum"))
        .unwrap_or_else(|| PathBuf::from(".vellum"))
}

impl VellumConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> VellumResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| VellumError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| VellumError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| VellumError::Configuration(e.to_string())),
            _ => Err(VellumError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unknown provider names are a configuration error rather than a
    /// silent fallback.
    pub fn from_env() -> VellumResult<Self> {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("VELLUM_TABLE_PROVIDER") {
            config.table.provider = provider
                .parse()
                .map_err(|_| VellumError::Configuration(format!("Unknown table provider '{}'", provider)))?;
            if config.table.provider != TableProvider::Sqlite {
                config.table.config = serde_json::json!({});
            }
        }

        if let Ok(name) = std::env::var("VELLUM_TABLE_NAME") {
            config.table.table_name = name;
        }

        let options = [
            ("VELLUM_SQLITE_PATH", "path"),
            ("VELLUM_DYNAMODB_ENDPOINT", "endpoint_url"),
            ("VELLUM_DYNAMODB_REGION", "region"),
        ];
        for (var, option) in options {
            if let Ok(value) = std::env::var(var) {
                config.set_option(option, value);
            }
        }

        if let Ok(size) = std::env::var("VELLUM_PAGE_SIZE") {
            config.page_size = size
                .parse()
                .map_err(|_| VellumError::Configuration(format!("Invalid page size '{}'", size)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> VellumConfigBuilder {
        VellumConfigBuilder::default()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> VellumResult<()> {
        if self.table.table_name.trim().is_empty() {
            return Err(VellumError::Configuration("Table name must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(VellumError::Configuration("Page size must be at least 1".to_string()));
        }
        Ok(())
    }

    fn set_option(&mut self, name: &str, value: String) {
        if !self.table.config.is_object() {
            self.table.config = serde_json::json!({});
        }
        if let Some(map) = self.table.config.as_object_mut() {
            map.insert(name.to_string(), serde_json::Value::String(value));
        }
    }
}

/// Builder for VellumConfig.
#[derive(Default)]
pub struct VellumConfigBuilder {
    config: VellumConfig,
}

impl VellumConfigBuilder {
    /// Use the in-memory table.
    pub fn memory(mut self) -> Self {
        self.config.table.provider = TableProvider::Memory;
        self.config.table.config = serde_json::json!({});
        self
    }

    /// Use a SQLite table at `path`.
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.table.provider = TableProvider::Sqlite;
        self.config.table.config = serde_json::json!({
            "path": path.into().to_string_lossy(),
        });
        self
    }

    /// Use DynamoDB, optionally against a custom endpoint (e.g. DynamoDB Local).
    pub fn dynamodb(mut self, region: Option<String>, endpoint_url: Option<String>) -> Self {
        self.config.table.provider = TableProvider::DynamoDb;
        self.config.table.config = serde_json::json!({});
        if let Some(region) = region {
            self.config.set_option("region", region);
        }
        if let Some(endpoint) = endpoint_url {
            self.config.set_option("endpoint_url", endpoint);
        }
        self
    }

    /// Set the table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.config.table.table_name = name.into();
        self
    }

    /// Set the default listing page size.
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> VellumConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_sqlite_under_data_dir() {
        let config = VellumConfig::default();
        assert_eq!(config.table.provider, TableProvider::Sqlite);
        assert!(config.table.option_str("path").unwrap().ends_with("vellum.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = VellumConfig::builder()
            .dynamodb(Some("eu-west-1".to_string()), Some("http://localhost:8000".to_string()))
            .table_name("prenups")
            .page_size(10)
            .build();

        assert_eq!(config.table.provider, TableProvider::DynamoDb);
        assert_eq!(config.table.table_name, "prenups");
        assert_eq!(config.table.option_str("region"), Some("eu-west-1"));
        assert_eq!(config.table.option_str("endpoint_url"), Some("http://localhost:8000"));
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
page_size = 25

[table]
provider = "memory"
table_name = "drafts"
"#
        )
        .unwrap();

        let config = VellumConfig::from_file(file.path()).unwrap();
        assert_eq!(config.table.provider, TableProvider::Memory);
        assert_eq!(config.table.table_name, "drafts");
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "table:\n  provider: sqlite\n  config:\n    path: /tmp/v.db\n"
        )
        .unwrap();

        let config = VellumConfig::from_file(file.path()).unwrap();
        assert_eq!(config.table.provider, TableProvider::Sqlite);
        assert_eq!(config.table.option_str("path"), Some("/tmp/v.db"));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = VellumConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, VellumError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = VellumConfig::builder().memory().page_size(0).build();
        assert!(config.validate().is_err());
    }
}
