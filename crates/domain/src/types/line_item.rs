//! Opportunity line item types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::TEMPORARY_LINE_ITEM_PREFIX;

/// Identity of a line item.
///
/// Temporary ids are minted client-side and tell the adapter to insert the
/// row; persisted ids were assigned by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "lowercase")]
pub enum LineItemId {
    Temporary(String),
    Persisted(String),
}

impl LineItemId {
    /// Mint a fresh client-side id.
    pub fn temporary() -> Self {
        Self::Temporary(format!("{TEMPORARY_LINE_ITEM_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn persisted(id: impl Into<String>) -> Self {
        Self::Persisted(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Temporary(id) | Self::Persisted(id) => id,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl std::fmt::Display for LineItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product quantity/price entry attached to an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    /// Blank while the owning opportunity is still a draft.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    pub product_id: String,
    /// Display-only, joined from the catalog when listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    /// `quantity × unit_price`, always recomputed from the row's own values.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}
