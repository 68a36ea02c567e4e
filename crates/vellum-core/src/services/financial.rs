//! Financial disclosures submitted by each party.

use std::sync::Arc;

use crate::domain::{Agreement, FinancialDisclosure, LineItem, Party};
use crate::error::{VellumError, VellumResult};
use crate::store::VersionedStore;
use crate::types::{partition_key, EntityKind, EntityRecord, Stored};

/// Replacement line items for [`FinancialService::revise`]. `None` keeps a section.
#[derive(Debug, Clone, Default)]
pub struct DisclosureRevision {
    pub assets: Option<Vec<LineItem>>,
    pub liabilities: Option<Vec<LineItem>>,
    pub income: Option<Vec<LineItem>>,
}

pub struct FinancialService {
    store: Arc<VersionedStore>,
}

impl FinancialService {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self { store }
    }

    /// Submit a disclosure for `owner_id`, who must be a party to the agreement.
    pub async fn submit(
        &self,
        agreement_id: &str,
        owner_id: &str,
        assets: Vec<LineItem>,
        liabilities: Vec<LineItem>,
        income: Vec<LineItem>,
    ) -> VellumResult<Stored<FinancialDisclosure>> {
        let agreement = self
            .store
            .get_typed::<Agreement>(agreement_id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::Agreement, agreement_id)))?;

        let party = if agreement.data.owner_id == owner_id {
            Party::Owner
        } else if agreement.data.partner_id.as_deref() == Some(owner_id) {
            Party::Partner
        } else {
            return Err(VellumError::validation(format!(
                "User {} is not a party to agreement {}",
                owner_id, agreement_id
            )));
        };

        let existing = self.for_agreement(agreement_id).await?;
        if existing.iter().any(|d| d.data.party == party) {
            return Err(VellumError::conflict(format!(
                "The {} already submitted a disclosure for agreement {}; revise it instead",
                party, agreement_id
            )));
        }

        let disclosure =
            FinancialDisclosure::new(agreement_id, owner_id, party, assets, liabilities, income)?;
        let stored = self.store.create_typed(&disclosure).await?;
        tracing::info!(disclosure_id = %stored.id, agreement_id, %party, "submitted disclosure");
        Ok(stored)
    }

    pub async fn get(&self, id: &str) -> VellumResult<Option<Stored<FinancialDisclosure>>> {
        self.store.get_typed(id).await
    }

    /// Disclosures filed against an agreement. Scans every disclosure.
    pub async fn for_agreement(
        &self,
        agreement_id: &str,
    ) -> VellumResult<Vec<Stored<FinancialDisclosure>>> {
        let records = self
            .store
            .find_where(EntityKind::FinancialDisclosure, |record| {
                record.get_str("agreementId") == Some(agreement_id)
            })
            .await?;
        records.into_iter().map(EntityRecord::into_stored).collect()
    }

    /// Replace line items and recompute totals, archiving the previous disclosure.
    pub async fn revise(
        &self,
        id: &str,
        revision: DisclosureRevision,
    ) -> VellumResult<Stored<FinancialDisclosure>> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| VellumError::not_found(partition_key(EntityKind::FinancialDisclosure, id)))?;

        let mut disclosure = current.data;
        if let Some(assets) = revision.assets {
            disclosure.assets = assets;
        }
        if let Some(liabilities) = revision.liabilities {
            disclosure.liabilities = liabilities;
        }
        if let Some(income) = revision.income {
            disclosure.income = income;
        }
        disclosure.recompute_totals()?;

        self.store.update_typed(id, &disclosure, true).await
    }

    pub async fn delete(&self, id: &str) -> VellumResult<usize> {
        self.store.delete(EntityKind::FinancialDisclosure, id).await
    }
}
