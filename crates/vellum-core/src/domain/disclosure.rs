//! Financial disclosure records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{VellumError, VellumResult};
use crate::types::{Entity, EntityKind};

/// Which side of the agreement a disclosure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Owner,
    Partner,
}

/// One asset, liability or income entry. Amounts are whole cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub amount_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LineItem {
    pub fn new(description: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            description: description.into(),
            amount_cents,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One party's disclosure of assets, liabilities and income.
///
/// The totals are derived from the line items whenever the disclosure is
/// written; use [`FinancialDisclosure::recompute_totals`] after editing items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialDisclosure {
    pub agreement_id: String,
    pub owner_id: String,
    pub party: Party,
    #[serde(default)]
    pub assets: Vec<LineItem>,
    #[serde(default)]
    pub liabilities: Vec<LineItem>,
    #[serde(default)]
    pub income: Vec<LineItem>,
    #[serde(default)]
    pub total_assets_cents: i64,
    #[serde(default)]
    pub total_liabilities_cents: i64,
    #[serde(default)]
    pub annual_income_cents: i64,
    #[serde(default)]
    pub net_worth_cents: i64,
}

impl Entity for FinancialDisclosure {
    const KIND: EntityKind = EntityKind::FinancialDisclosure;
}

impl FinancialDisclosure {
    /// Build a disclosure with totals filled in.
    pub fn new(
        agreement_id: impl Into<String>,
        owner_id: impl Into<String>,
        party: Party,
        assets: Vec<LineItem>,
        liabilities: Vec<LineItem>,
        income: Vec<LineItem>,
    ) -> VellumResult<Self> {
        let mut disclosure = Self {
            agreement_id: agreement_id.into(),
            owner_id: owner_id.into(),
            party,
            assets,
            liabilities,
            income,
            total_assets_cents: 0,
            total_liabilities_cents: 0,
            annual_income_cents: 0,
            net_worth_cents: 0,
        };
        disclosure.recompute_totals()?;
        Ok(disclosure)
    }

    /// Validate line items and refresh the derived totals.
    pub fn recompute_totals(&mut self) -> VellumResult<()> {
        self.total_assets_cents = sum_items("assets", &self.assets)?;
        self.total_liabilities_cents = sum_items("liabilities", &self.liabilities)?;
        self.annual_income_cents = sum_items("income", &self.income)?;
        self.net_worth_cents = self
            .total_assets_cents
            .checked_sub(self.total_liabilities_cents)
            .ok_or_else(|| VellumError::validation("Net worth overflows"))?;
        Ok(())
    }
}

fn sum_items(section: &str, items: &[LineItem]) -> VellumResult<i64> {
    items.iter().try_fold(0i64, |total, item| {
        if item.description.trim().is_empty() {
            return Err(VellumError::validation(format!(
                "Every {} entry needs a description",
                section
            )));
        }
        if item.amount_cents < 0 {
            return Err(VellumError::validation(format!(
                "{} entry '{}' has a negative amount",
                section, item.description
            )));
        }
        total
            .checked_add(item.amount_cents)
            .ok_or_else(|| VellumError::validation(format!("{} total overflows", section)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_are_derived() {
        let disclosure = FinancialDisclosure::new(
            "a-1",
            "u-1",
            Party::Owner,
            vec![
                LineItem::new("House", 50_000_000).with_category("real_estate"),
                LineItem::new("Savings", 2_500_000),
            ],
            vec![LineItem::new("Mortgage", 30_000_000)],
            vec![LineItem::new("Salary", 12_000_000)],
        )
        .unwrap();

        assert_eq!(disclosure.total_assets_cents, 52_500_000);
        assert_eq!(disclosure.total_liabilities_cents, 30_000_000);
        assert_eq!(disclosure.net_worth_cents, 22_500_000);
        assert_eq!(disclosure.annual_income_cents, 12_000_000);
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let err = FinancialDisclosure::new(
            "a-1",
            "u-1",
            Party::Partner,
            vec![LineItem::new("Car", -1)],
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_blank_description_rejected() {
        assert!(FinancialDisclosure::new(
            "a-1",
            "u-1",
            Party::Owner,
            vec![],
            vec![LineItem::new("  ", 10)],
            vec![],
        )
        .is_err());
    }

    #[test]
    fn test_party_serde() {
        assert_eq!(serde_json::to_string(&Party::Partner).unwrap(), "\"partner\"");
    }
}
