//! Line-item ledger
//!
//! Working list of product line items for the opportunity being edited. The
//! ledger only computes totals; pushing the grand total into the opportunity
//! value is the owning draft's job (see [`crate::draft::OpportunityDraft`]).

use dealdesk_domain::constants::DEFAULT_LINE_ITEM_QUANTITY;
use dealdesk_domain::{LineItem, LineItemId, Product};
use rust_decimal::Decimal;
use tracing::debug;

/// Proof that the user confirmed removing one line item.
///
/// Obtained from [`LineItemLedger::request_removal`]; dropping it cancels.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a removal only happens once the request is confirmed"]
pub struct RemovalRequest {
    id: LineItemId,
}

impl RemovalRequest {
    pub fn line_item_id(&self) -> &LineItemId {
        &self.id
    }
}

/// Line items attached to one opportunity draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemLedger {
    opportunity_id: Option<String>,
    items: Vec<LineItem>,
}

impl LineItemLedger {
    /// Empty ledger for a draft (`None`) or a persisted opportunity.
    pub fn new(opportunity_id: Option<String>) -> Self {
        Self { opportunity_id, items: Vec::new() }
    }

    /// Ledger seeded with line items loaded from the store.
    pub fn from_items(opportunity_id: Option<String>, items: Vec<LineItem>) -> Self {
        Self { opportunity_id, items }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn opportunity_id(&self) -> Option<&str> {
        self.opportunity_id.as_deref()
    }

    /// Append a line item with a temporary id.
    ///
    /// Missing or non-positive quantities become 1; a missing or negative
    /// unit price becomes 0. Returns `None` without touching the list when no
    /// product is selected.
    pub fn add_line_item(
        &mut self,
        product_id: Option<&str>,
        quantity: Option<i64>,
        unit_price: Option<Decimal>,
    ) -> Option<LineItemId> {
        let product_id = product_id.map(str::trim).filter(|id| !id.is_empty())?;
        Some(self.push(product_id.to_string(), None, quantity, unit_price))
    }

    /// Append a line item priced at the product's list price.
    pub fn add_product(&mut self, product: &Product, quantity: Option<i64>) -> LineItemId {
        self.push(product.id.clone(), Some(product.name.clone()), quantity, Some(product.price))
    }

    /// First step of a removal: locate the item and ask for confirmation.
    pub fn request_removal(&self, id: &LineItemId) -> Option<RemovalRequest> {
        self.items.iter().any(|item| &item.id == id).then(|| RemovalRequest { id: id.clone() })
    }

    /// Second step of a removal. Returns the removed item.
    pub fn confirm_removal(&mut self, request: RemovalRequest) -> Option<LineItem> {
        let index = self.items.iter().position(|item| item.id == request.id)?;
        let removed = self.items.remove(index);
        debug!(line_item_id = %removed.id, remaining = self.items.len(), "line item removed");
        Some(removed)
    }

    /// `quantity × unit_price`, never read back from storage.
    pub fn line_total(item: &LineItem) -> Decimal {
        item.line_total()
    }

    /// Sum of all line totals.
    pub fn grand_total(&self) -> Decimal {
        self.items.iter().map(Self::line_total).sum()
    }

    fn push(
        &mut self,
        product_id: String,
        product_name: Option<String>,
        quantity: Option<i64>,
        unit_price: Option<Decimal>,
    ) -> LineItemId {
        let id = LineItemId::temporary();
        let item = LineItem {
            id: id.clone(),
            opportunity_id: self.opportunity_id.clone(),
            product_id,
            product_name,
            quantity: normalize_quantity(quantity),
            unit_price: normalize_price(unit_price),
        };
        debug!(
            line_item_id = %id,
            product_id = %item.product_id,
            quantity = item.quantity,
            "line item added"
        );
        self.items.push(item);
        id
    }
}

fn normalize_quantity(quantity: Option<i64>) -> u32 {
    match quantity {
        Some(q) if q >= 1 => u32::try_from(q).unwrap_or(u32::MAX),
        _ => DEFAULT_LINE_ITEM_QUANTITY,
    }
}

fn normalize_price(unit_price: Option<Decimal>) -> Decimal {
    unit_price.filter(|price| !price.is_sign_negative()).unwrap_or(Decimal::ZERO)
}
