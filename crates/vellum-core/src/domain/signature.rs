//! Signatures and partner invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Entity, EntityKind};

/// A party's signature on an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub agreement_id: String,
    pub signer_id: String,
    pub signed_at: DateTime<Utc>,
    /// Agreement revision the signer saw.
    pub agreement_revision: u32,
}

impl Entity for Signature {
    const KIND: EntityKind = EntityKind::Signature;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Revoked,
}

/// Invitation for the other party to join an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInvitation {
    pub agreement_id: String,
    pub inviter_id: String,
    pub invitee_email: String,
    pub status: InvitationStatus,
}

impl Entity for PartnerInvitation {
    const KIND: EntityKind = EntityKind::PartnerInvitation;
}
