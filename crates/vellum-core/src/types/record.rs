//! Entity records as the store reads and writes them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntityKind, ItemKey, VersionTag};
use crate::error::{ErrorCode, VellumError, VellumResult};

/// Free-form domain fields of a record.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Attribute names owned by the store. Domain fields may not use them.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "entityType",
    "version",
    "revision",
    "createdAt",
    "updatedAt",
    "PK",
    "SK",
];

/// Reject field maps that try to set store-owned attributes.
pub fn validate_fields(fields: &FieldMap) -> VellumResult<()> {
    let clashes: Vec<&str> = RESERVED_FIELDS
        .iter()
        .copied()
        .filter(|name| fields.contains_key(*name))
        .collect();

    if clashes.is_empty() {
        Ok(())
    } else {
        Err(VellumError::Validation {
            message: format!("Fields {:?} are managed by the store", clashes),
            code: ErrorCode::ValReservedField,
            details: clashes
                .iter()
                .map(|name| (name.to_string(), "reserved".to_string()))
                .collect(),
            suggestion: Some("Remove store-managed attributes from the payload".to_string()),
        })
    }
}

/// A typed domain record bound to one entity kind.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Kind under which records of this type are stored.
    const KIND: EntityKind;
}

/// One stored version of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Opaque entity identifier.
    pub id: String,
    /// Kind tag.
    pub entity_type: EntityKind,
    /// Slot this record occupies.
    pub version: VersionTag,
    /// Number of versioned updates applied before this snapshot.
    #[serde(default)]
    pub revision: u32,
    /// Creation time; shared by every version of the entity.
    pub created_at: DateTime<Utc>,
    /// Last modification time of this snapshot.
    pub updated_at: DateTime<Utc>,
    /// Domain fields.
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl EntityRecord {
    /// Composite table key of this record.
    pub fn key(&self) -> ItemKey {
        ItemKey::for_entity(self.entity_type, &self.id, self.version)
    }

    /// Get a field value as a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }

    /// Overlay `patch` onto the domain fields (shallow, last write wins).
    pub fn apply_patch(&mut self, patch: &FieldMap) {
        for (name, value) in patch {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Deserialize the domain fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> VellumResult<T> {
        serde_json::from_value(serde_json::Value::Object(self.fields.clone())).map_err(|e| {
            VellumError::parse(format!(
                "{} does not decode as {}: {}",
                self.key(),
                std::any::type_name::<T>(),
                e
            ))
        })
    }

    /// Decode into a [`Stored`] wrapper carrying the store metadata.
    pub fn into_stored<T: Entity>(self) -> VellumResult<Stored<T>> {
        if self.entity_type != T::KIND {
            return Err(VellumError::parse(format!(
                "{} is a {} record, expected {}",
                self.key(),
                self.entity_type,
                T::KIND
            )));
        }
        let data = self.decode::<T>()?;
        Ok(Stored {
            id: self.id,
            version: self.version,
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data,
        })
    }
}

/// Input to `create`: everything except the store-stamped metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub id: String,
    pub fields: FieldMap,
}

impl NewEntity {
    /// New entity with a generated UUIDv4 id.
    pub fn new(kind: EntityKind, fields: FieldMap) -> Self {
        Self::with_id(kind, Uuid::new_v4().to_string(), fields)
    }

    /// New entity with a caller-chosen id.
    pub fn with_id(kind: EntityKind, id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            kind,
            id: id.into(),
            fields,
        }
    }

    /// Build from a typed record.
    pub fn from_entity<T: Entity>(value: &T) -> VellumResult<Self> {
        Ok(Self::new(T::KIND, to_field_map(value)?))
    }
}

/// Serialize a value into a field map; it must serialize as a JSON object.
pub fn to_field_map<T: Serialize>(value: &T) -> VellumResult<FieldMap> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(VellumError::validation(format!(
            "Entity payload must be a JSON object, got {}",
            other
        ))),
    }
}

/// A typed record together with its store metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    pub id: String,
    pub version: VersionTag,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

/// Summary of an entity's version family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: String,
    pub kind: EntityKind,
    /// Revision of the current record.
    pub current_revision: u32,
    /// Number of archived snapshots present in the table.
    pub archived_versions: u32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// One page of a kind listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Pass back to fetch the next page; `None` when the scan is exhausted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
