//! Entity kinds stored in the wide table.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The closed set of record categories the store knows about.
///
/// Kinds serialize to snake_case in the `entityType` attribute and map to an
/// upper-case prefix in the partition key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Account holder.
    User,
    /// A prenuptial agreement draft.
    Agreement,
    /// One party's financial disclosure for an agreement.
    FinancialDisclosure,
    /// Metadata for an uploaded document.
    Document,
    /// A party's signature on an agreement.
    Signature,
    /// Invitation sent to the other party of an agreement.
    PartnerInvitation,
}

impl EntityKind {
    /// Partition key prefix for this kind.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Agreement => "AGREEMENT",
            Self::FinancialDisclosure => "DISCLOSURE",
            Self::Document => "DOCUMENT",
            Self::Signature => "SIGNATURE",
            Self::PartnerInvitation => "INVITATION",
        }
    }

    /// Reverse lookup from a partition key prefix.
    pub fn from_key_prefix(prefix: &str) -> Option<Self> {
        Self::iter().find(|kind| kind.key_prefix() == prefix)
    }

    /// All kind names as static strings.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|k| k.into()).collect()
    }
}
