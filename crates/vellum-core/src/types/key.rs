//! Physical key layout of the wide table.
//!
//! Partition key: `{KIND_PREFIX}#{id}` (for example `USER#3f2c...`).
//! Sort key: the version tag (`V0`, `V1`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntityKind, VersionTag};
use crate::error::{ErrorCode, VellumError, VellumResult};

const PK_SEPARATOR: char = '#';
const TOKEN_SEPARATOR: char = '|';

/// Build the partition key for an entity.
pub fn partition_key(kind: EntityKind, id: &str) -> String {
    format!("{}{}{}", kind.key_prefix(), PK_SEPARATOR, id)
}

/// Prefix shared by every partition key of a kind.
pub fn kind_prefix(kind: EntityKind) -> String {
    format!("{}{}", kind.key_prefix(), PK_SEPARATOR)
}

/// Split a partition key back into kind and id.
pub fn parse_partition_key(pk: &str) -> Option<(EntityKind, &str)> {
    let (prefix, id) = pk.split_once(PK_SEPARATOR)?;
    if id.is_empty() {
        return None;
    }
    EntityKind::from_key_prefix(prefix).map(|kind| (kind, id))
}

/// Composite primary key of one table item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    /// Partition key.
    pub pk: String,
    /// Sort key.
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Key of one version slot of an entity.
    pub fn for_entity(kind: EntityKind, id: &str, version: VersionTag) -> Self {
        Self::new(partition_key(kind, id), version.to_string())
    }

    /// Key of the current record of an entity.
    pub fn current(kind: EntityKind, id: &str) -> Self {
        Self::for_entity(kind, id, VersionTag::CURRENT)
    }

    /// Parsed version tag of the sort key.
    pub fn version(&self) -> VellumResult<VersionTag> {
        self.sk.parse()
    }

    /// Encode as an opaque page token.
    pub fn to_page_token(&self) -> String {
        format!("{}{}{}", self.pk, TOKEN_SEPARATOR, self.sk)
    }

    /// Decode a page token produced by [`ItemKey::to_page_token`].
    pub fn from_page_token(token: &str) -> VellumResult<Self> {
        // Sort keys never contain the separator, ids might.
        let (pk, sk) = token.rsplit_once(TOKEN_SEPARATOR).ok_or_else(|| {
            VellumError::validation_with_code(
                format!("Malformed page token '{}'", token),
                ErrorCode::ValInvalidPageToken,
            )
        })?;

        if parse_partition_key(pk).is_none() || sk.parse::<VersionTag>().is_err() {
            return Err(VellumError::validation_with_code(
                format!("Malformed page token '{}'", token),
                ErrorCode::ValInvalidPageToken,
            ));
        }

        Ok(Self::new(pk, sk))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}
