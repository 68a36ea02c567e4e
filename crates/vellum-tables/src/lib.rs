//! vellum-tables - Table backend implementations for vellum.
//!
//! # Supported Backends
//!
//! - **Memory** (always available, from `vellum-core`) - process-local table
//! - **SQLite** (feature: `sqlite`, default) - single-file table via `rusqlite`
//! - **DynamoDB** (feature: `dynamodb`) - Amazon DynamoDB via `aws-sdk-dynamodb`

mod factory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "dynamodb")]
mod dynamodb;

// Public exports
pub use factory::TableFactory;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTable;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbTable;

// Re-export core types for convenience
pub use vellum_core::traits::{
    ScanPage, ScanRequest, TableBackend, TableConfig, TableItem, TableProvider,
};
pub use vellum_core::MemoryTable;
