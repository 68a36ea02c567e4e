//! Agreements, partner invitations and signatures.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::domain::{
    is_jurisdiction, normalize_email, Agreement, AgreementStatus, InvitationStatus,
    PartnerInvitation, Signature, UserProfile,
};
use crate::error::{ErrorCode, VellumError, VellumResult};
use crate::store::VersionedStore;
use crate::types::{partition_key, EntityKind, EntityRecord, FieldMap, Stored};

pub struct AgreementService {
    store: Arc<VersionedStore>,
}

impl AgreementService {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self { store }
    }

    /// Start a draft owned by `owner_id` under the law of `jurisdiction`.
    pub async fn create_draft(
        &self,
        owner_id: &str,
        title: &str,
        jurisdiction: &str,
    ) -> VellumResult<Stored<Agreement>> {
        let jurisdiction = jurisdiction.trim().to_uppercase();
        if !is_jurisdiction(&jurisdiction) {
            return Err(VellumError::validation_with_suggestion(
                format!("'{}' is not a supported jurisdiction", jurisdiction),
                "Use a two-letter US state code such as CA or NY",
            ));
        }
        if title.trim().is_empty() {
            return Err(VellumError::validation("An agreement needs a title"));
        }
        self.require(EntityKind::User, owner_id).await?;

        let agreement = Agreement {
            title: title.trim().to_string(),
            jurisdiction,
            status: AgreementStatus::Draft,
            owner_id: owner_id.to_string(),
            partner_id: None,
            partner_email: None,
            content: json!({}),
        };
        let stored = self.store.create_typed(&agreement).await?;
        tracing::info!(agreement_id = %stored.id, owner_id, "created draft agreement");
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> VellumResult<Option<Stored<Agreement>>> {
        self.store.get_typed(id).await
    }

    /// Agreements where `user_id` is owner or partner. Scans every agreement.
    pub async fn list_for_user(&self, user_id: &str) -> VellumResult<Vec<Stored<Agreement>>> {
        let records = self
            .store
            .find_where(EntityKind::Agreement, |record| {
                record.get_str("ownerId") == Some(user_id)
                    || record.get_str("partnerId") == Some(user_id)
            })
            .await?;
        records.into_iter().map(EntityRecord::into_stored).collect()
    }

    /// Replace clause content (and optionally the title), archiving the previous draft.
    pub async fn update_content(
        &self,
        id: &str,
        content: serde_json::Value,
        title: Option<&str>,
    ) -> VellumResult<Stored<Agreement>> {
        let current = self.require_agreement(id).await?;
        if !current.data.status.is_editable() {
            return Err(VellumError::validation_with_code(
                format!("Agreement {} is {} and can no longer be edited", id, current.data.status),
                ErrorCode::ValInvalidTransition,
            ));
        }

        let mut fields = FieldMap::new();
        fields.insert("content".to_string(), content);
        if let Some(title) = title {
            fields.insert("title".to_string(), json!(title.trim()));
        }
        self.store
            .update(EntityKind::Agreement, id, fields, true)
            .await?
            .into_stored()
    }

    /// Move the agreement through its lifecycle. Status is metadata: no archive.
    pub async fn set_status(
        &self,
        id: &str,
        status: AgreementStatus,
    ) -> VellumResult<Stored<Agreement>> {
        let current = self.require_agreement(id).await?;
        if !current.data.status.can_transition_to(status) {
            return Err(VellumError::validation_with_code(
                format!("Cannot move agreement {} from {} to {}", id, current.data.status, status),
                ErrorCode::ValInvalidTransition,
            ));
        }
        if status == AgreementStatus::AwaitingSignatures && current.data.partner_id.is_none() {
            return Err(VellumError::validation_with_code(
                format!("Agreement {} has no partner to sign it", id),
                ErrorCode::ValInvalidTransition,
            ));
        }

        let mut fields = FieldMap::new();
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        self.store
            .update(EntityKind::Agreement, id, fields, false)
            .await?
            .into_stored()
    }

    /// Attach the partner and cache the email from their profile.
    ///
    /// Only editable agreements take a partner, and a partner once attached
    /// cannot be replaced. Attaching the same partner again changes nothing.
    pub async fn attach_partner(&self, id: &str, partner_id: &str) -> VellumResult<Stored<Agreement>> {
        let current = self.require_agreement(id).await?;
        if current.data.owner_id == partner_id {
            return Err(VellumError::validation("The owner cannot be their own partner"));
        }
        match current.data.partner_id.as_deref() {
            Some(existing) if existing == partner_id => return Ok(current),
            Some(_) => {
                return Err(VellumError::conflict(format!(
                    "Agreement {} already has a partner",
                    id
                )))
            }
            None => {}
        }
        if !current.data.status.is_editable() {
            return Err(VellumError::validation_with_code(
                format!("Agreement {} is {} and can no longer take a partner", id, current.data.status),
                ErrorCode::ValInvalidTransition,
            ));
        }
        let partner = self.require_user(partner_id).await?;

        let mut fields = FieldMap::new();
        fields.insert("partnerId".to_string(), json!(partner_id));
        fields.insert("partnerEmail".to_string(), json!(partner.data.email));
        self.store
            .update(EntityKind::Agreement, id, fields, true)
            .await?
            .into_stored()
    }

    /// Invite the other party by email.
    pub async fn invite_partner(
        &self,
        agreement_id: &str,
        inviter_id: &str,
        invitee_email: &str,
    ) -> VellumResult<Stored<PartnerInvitation>> {
        let invitee_email = normalize_email(invitee_email)?;
        let agreement = self.require_agreement(agreement_id).await?;
        if agreement.data.owner_id != inviter_id {
            return Err(VellumError::validation("Only the owner can invite a partner"));
        }
        if agreement.data.partner_id.is_some() {
            return Err(VellumError::conflict(format!(
                "Agreement {} already has a partner",
                agreement_id
            )));
        }

        let invitation = PartnerInvitation {
            agreement_id: agreement_id.to_string(),
            inviter_id: inviter_id.to_string(),
            invitee_email,
            status: InvitationStatus::Pending,
        };
        self.store.create_typed(&invitation).await
    }

    /// Accept a pending invitation and attach `partner_id` to the agreement.
    /// The accepting account's email must be the one the invitation went to.
    pub async fn accept_invitation(
        &self,
        invitation_id: &str,
        partner_id: &str,
    ) -> VellumResult<Stored<Agreement>> {
        let invitation = self.require_pending_invitation(invitation_id).await?;
        let partner = self.require_user(partner_id).await?;
        if partner.data.email != invitation.data.invitee_email {
            return Err(VellumError::validation(format!(
                "Invitation {} was not sent to user {}",
                invitation_id, partner_id
            )));
        }

        let agreement = self
            .attach_partner(&invitation.data.agreement_id, partner_id)
            .await?;
        self.set_invitation_status(invitation_id, InvitationStatus::Accepted)
            .await?;
        tracing::info!(invitation_id, partner_id, "invitation accepted");
        Ok(agreement)
    }

    /// The invitee turns a pending invitation down.
    pub async fn decline_invitation(
        &self,
        invitation_id: &str,
        user_id: &str,
    ) -> VellumResult<Stored<PartnerInvitation>> {
        let invitation = self.require_pending_invitation(invitation_id).await?;
        let user = self.require_user(user_id).await?;
        if user.data.email != invitation.data.invitee_email {
            return Err(VellumError::validation(format!(
                "Invitation {} was not sent to user {}",
                invitation_id, user_id
            )));
        }
        self.set_invitation_status(invitation_id, InvitationStatus::Declined)
            .await
    }

    /// The inviter withdraws a pending invitation.
    pub async fn revoke_invitation(
        &self,
        invitation_id: &str,
        inviter_id: &str,
    ) -> VellumResult<Stored<PartnerInvitation>> {
        let invitation = self.require_pending_invitation(invitation_id).await?;
        if invitation.data.inviter_id != inviter_id {
            return Err(VellumError::validation("Only the inviter can revoke an invitation"));
        }
        self.set_invitation_status(invitation_id, InvitationStatus::Revoked)
            .await
    }

    /// Record `signer_id`'s signature on the current revision. Once both
    /// parties signed that revision, the agreement is `signed`.
    pub async fn sign(&self, agreement_id: &str, signer_id: &str) -> VellumResult<Stored<Signature>> {
        let agreement = self.require_agreement(agreement_id).await?;
        if agreement.data.status != AgreementStatus::AwaitingSignatures {
            return Err(VellumError::validation_with_code(
                format!("Agreement {} is {}, not awaiting signatures", agreement_id, agreement.data.status),
                ErrorCode::ValInvalidTransition,
            ));
        }
        if !agreement.data.involves(signer_id) {
            return Err(VellumError::validation(format!(
                "User {} is not a party to agreement {}",
                signer_id, agreement_id
            )));
        }

        // Signatures over superseded content do not count.
        let existing: Vec<_> = self
            .signatures(agreement_id)
            .await?
            .into_iter()
            .filter(|s| s.data.agreement_revision == agreement.revision)
            .collect();
        if existing.iter().any(|s| s.data.signer_id == signer_id) {
            return Err(VellumError::conflict(format!(
                "User {} already signed agreement {}",
                signer_id, agreement_id
            )));
        }

        let signature = Signature {
            agreement_id: agreement_id.to_string(),
            signer_id: signer_id.to_string(),
            signed_at: Utc::now(),
            agreement_revision: agreement.revision,
        };
        let stored = self.store.create_typed(&signature).await?;

        if existing.len() + 1 >= 2 {
            self.set_status(agreement_id, AgreementStatus::Signed).await?;
            tracing::info!(agreement_id, revision = agreement.revision, "agreement fully signed");
        }
        Ok(stored)
    }

    /// Signatures recorded for an agreement. Scans every signature.
    pub async fn signatures(&self, agreement_id: &str) -> VellumResult<Vec<Stored<Signature>>> {
        let records = self
            .store
            .find_where(EntityKind::Signature, |record| {
                record.get_str("agreementId") == Some(agreement_id)
            })
            .await?;
        records.into_iter().map(EntityRecord::into_stored).collect()
    }

    /// Current agreement followed by its archives, newest archive last.
    pub async fn versions(&self, id: &str) -> VellumResult<Vec<Stored<Agreement>>> {
        self.store
            .list_versions(EntityKind::Agreement, id)
            .await?
            .into_iter()
            .map(EntityRecord::into_stored)
            .collect()
    }

    pub async fn delete(&self, id: &str) -> VellumResult<usize> {
        self.store.delete(EntityKind::Agreement, id).await
    }

    async fn require_agreement(&self, id: &str) -> VellumResult<Stored<Agreement>> {
        self.store
            .get_typed::<Agreement>(id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::Agreement, id)))
    }

    async fn require_user(&self, id: &str) -> VellumResult<Stored<UserProfile>> {
        self.store
            .get_typed::<UserProfile>(id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::User, id)))
    }

    async fn require_pending_invitation(&self, id: &str) -> VellumResult<Stored<PartnerInvitation>> {
        let invitation = self
            .store
            .get_typed::<PartnerInvitation>(id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::PartnerInvitation, id)))?;
        if invitation.data.status != InvitationStatus::Pending {
            return Err(VellumError::validation_with_code(
                format!("Invitation {} is already {}", id, invitation.data.status),
                ErrorCode::ValInvalidTransition,
            ));
        }
        Ok(invitation)
    }

    async fn set_invitation_status(
        &self,
        id: &str,
        status: InvitationStatus,
    ) -> VellumResult<Stored<PartnerInvitation>> {
        let mut fields = FieldMap::new();
        fields.insert("status".to_string(), serde_json::to_value(status)?);
        self.store
            .update(EntityKind::PartnerInvitation, id, fields, false)
            .await?
            .into_stored()
    }

    async fn require(&self, kind: EntityKind, id: &str) -> VellumResult<EntityRecord> {
        self.store
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(kind, id)))
    }
}
