//! Prenuptial agreement records and their lifecycle.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Entity, EntityKind};

/// Two-letter codes of the US states plus DC.
pub const JURISDICTIONS: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

/// Whether `code` (already upper-cased) names a supported jurisdiction.
pub fn is_jurisdiction(code: &str) -> bool {
    JURISDICTIONS.contains(&code)
}

/// Lifecycle status of an agreement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    #[default]
    Draft,
    PendingReview,
    AwaitingSignatures,
    Signed,
    Archived,
}

impl AgreementStatus {
    /// Whether moving from `self` to `next` is allowed. Staying put always is.
    pub fn can_transition_to(self, next: AgreementStatus) -> bool {
        use AgreementStatus::*;

        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, PendingReview)
                | (PendingReview, Draft)
                | (PendingReview, AwaitingSignatures)
                | (AwaitingSignatures, Draft)
                | (AwaitingSignatures, Signed)
                | (Draft | PendingReview | AwaitingSignatures | Signed, Archived)
        )
    }

    /// Content can only change before signatures are collected.
    pub fn is_editable(self) -> bool {
        matches!(self, AgreementStatus::Draft | AgreementStatus::PendingReview)
    }
}

/// A state-specific prenuptial agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub title: String,
    /// Two-letter state code whose law governs the agreement.
    pub jurisdiction: String,
    #[serde(default)]
    pub status: AgreementStatus,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    /// Partner's email cached when the partner is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_email: Option<String>,
    /// Free-form clause content edited by the wizard.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Entity for Agreement {
    const KIND: EntityKind = EntityKind::Agreement;
}

impl Agreement {
    /// Whether `user_id` is a party to this agreement.
    pub fn involves(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.partner_id.as_deref() == Some(user_id)
    }
}
