//! vellum-core - Core library for vellum.
//!
//! This crate provides the entity types, the table trait, the versioned
//! store and the domain services of vellum, a store for prenuptial
//! agreement records kept in one wide key-value table.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vellum_core::{EntityKind, MemoryTable, NewEntity, VersionedStore};
//!
//! let store = VersionedStore::new(Arc::new(MemoryTable::default()));
//!
//! let user = store.create(NewEntity::new(EntityKind::User, fields)).await?;
//! store.update(EntityKind::User, &user.id, patch, true).await?;
//!
//! // V0 is the current record, V1 the snapshot taken before the update
//! let versions = store.list_versions(EntityKind::User, &user.id).await?;
//! ```

pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use backend::MemoryTable;
pub use config::{VellumConfig, VellumConfigBuilder};
pub use error::{ErrorCode, VellumError, VellumResult};
pub use services::Services;
pub use store::VersionedStore;
pub use traits::{ScanPage, ScanRequest, TableBackend, TableConfig, TableItem, TableProvider};
pub use types::{
    Entity, EntityKind, EntityRecord, FieldMap, ItemKey, NewEntity, Page, Stored, VersionSummary,
    VersionTag,
};
