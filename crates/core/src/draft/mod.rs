//! Opportunity draft
//!
//! The in-memory, not-yet-saved version of an opportunity together with its
//! line-item ledger. The draft enforces the derived-value rule: whenever the
//! ledger is non-empty, `value` equals the ledger's grand total.

use std::str::FromStr;

use chrono::NaiveDate;
use dealdesk_domain::constants::CLOSE_DATE_FORMAT;
use dealdesk_domain::{
    impl_domain_status_conversions, ContactRef, DealDeskError, LineItem, LineItemId, Opportunity,
    OpportunityFields, Product, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::{LineItemLedger, RemovalRequest};

/// Field names accepted by [`OpportunityDraft::set_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityField {
    Title,
    Value,
    Stage,
    CloseDate,
    Lead,
    Customer,
}

impl_domain_status_conversions!(OpportunityField {
    Title => "title",
    Value => "value",
    Stage => "stage",
    CloseDate => "close_date",
    Lead => "lead",
    Customer => "customer",
});

/// Where the draft's line items stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemsState {
    /// Persisted line items are still being fetched.
    Loading,
    Ready,
    /// The fetch failed; the ledger content is unknown.
    Failed,
}

/// Editable draft of a single opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityDraft {
    opportunity_id: Option<String>,
    fields: OpportunityFields,
    /// Value restored when the ledger empties out.
    manual_value: Decimal,
    ledger: LineItemLedger,
    line_items: LineItemsState,
}

impl OpportunityDraft {
    /// Fresh draft with default fields and an empty ledger.
    pub fn open_for_create(default_stage: &str, today: NaiveDate) -> Self {
        let fields = OpportunityFields::new_default(default_stage, today);
        Self {
            opportunity_id: None,
            manual_value: fields.value,
            fields,
            ledger: LineItemLedger::new(None),
            line_items: LineItemsState::Ready,
        }
    }

    /// Draft of a persisted opportunity; line items arrive later through
    /// [`Self::load_line_items`]. Until then the persisted value is shown.
    pub fn open_for_edit(opportunity: &Opportunity) -> Self {
        Self {
            opportunity_id: Some(opportunity.id.clone()),
            fields: opportunity.fields(),
            manual_value: opportunity.value,
            ledger: LineItemLedger::new(Some(opportunity.id.clone())),
            line_items: LineItemsState::Loading,
        }
    }

    /// Replace the ledger with the persisted line items.
    pub fn load_line_items(&mut self, items: Vec<LineItem>) {
        self.ledger = LineItemLedger::from_items(self.opportunity_id.clone(), items);
        self.line_items = LineItemsState::Ready;
        self.sync_value();
    }

    pub fn mark_line_items_failed(&mut self) {
        self.line_items = LineItemsState::Failed;
    }

    pub fn opportunity_id(&self) -> Option<&str> {
        self.opportunity_id.as_deref()
    }

    pub fn is_new(&self) -> bool {
        self.opportunity_id.is_none()
    }

    pub fn fields(&self) -> &OpportunityFields {
        &self.fields
    }

    pub fn value(&self) -> Decimal {
        self.fields.value
    }

    pub fn ledger(&self) -> &LineItemLedger {
        &self.ledger
    }

    pub fn line_items_state(&self) -> LineItemsState {
        self.line_items
    }

    /// Generic field setter for form inputs.
    ///
    /// Only type conversion happens here; emptiness is checked at save time.
    /// Blank `close_date`, `lead` or `customer` clears the field.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        let field = OpportunityField::from_str(name).map_err(DealDeskError::InvalidInput)?;

        match field {
            OpportunityField::Title => self.set_title(value),
            OpportunityField::Stage => self.set_stage(value),
            OpportunityField::Value => {
                let trimmed = value.trim();
                let amount = if trimmed.is_empty() {
                    Decimal::ZERO
                } else {
                    Decimal::from_str(trimmed).map_err(|e| {
                        DealDeskError::InvalidInput(format!("invalid value '{trimmed}': {e}"))
                    })?
                };
                self.set_value(amount);
            }
            OpportunityField::CloseDate => {
                let trimmed = value.trim();
                let date = if trimmed.is_empty() {
                    None
                } else {
                    Some(NaiveDate::parse_from_str(trimmed, CLOSE_DATE_FORMAT).map_err(|e| {
                        DealDeskError::InvalidInput(format!("invalid close date '{trimmed}': {e}"))
                    })?)
                };
                self.set_close_date(date);
            }
            OpportunityField::Lead => {
                let id = value.trim();
                if id.is_empty() {
                    self.clear_contact_of(OpportunityField::Lead);
                } else {
                    self.set_contact(Some(ContactRef::Lead(id.to_string())));
                }
            }
            OpportunityField::Customer => {
                let id = value.trim();
                if id.is_empty() {
                    self.clear_contact_of(OpportunityField::Customer);
                } else {
                    self.set_contact(Some(ContactRef::Customer(id.to_string())));
                }
            }
        }

        debug!(field = %field, "draft field updated");
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) {
        self.fields.title = title.to_string();
    }

    pub fn set_stage(&mut self, stage: &str) {
        self.fields.stage = stage.to_string();
    }

    /// Manual pricing. Ignored while line items exist; the ledger total is
    /// the value then.
    pub fn set_value(&mut self, value: Decimal) {
        if self.ledger.is_empty() {
            self.manual_value = value;
        } else {
            debug!(requested = %value, "manual value ignored while line items exist");
        }
        self.sync_value();
    }

    pub fn set_close_date(&mut self, close_date: Option<NaiveDate>) {
        self.fields.close_date = close_date;
    }

    pub fn set_contact(&mut self, contact: Option<ContactRef>) {
        self.fields.contact = contact;
    }

    /// Add a line item; refused until the persisted items have loaded.
    pub fn add_line_item(
        &mut self,
        product_id: Option<&str>,
        quantity: Option<i64>,
        unit_price: Option<Decimal>,
    ) -> Option<LineItemId> {
        if self.line_items != LineItemsState::Ready {
            return None;
        }
        let id = self.ledger.add_line_item(product_id, quantity, unit_price)?;
        self.sync_value();
        Some(id)
    }

    /// Add a line item priced from the catalog.
    pub fn add_product(&mut self, product: &Product, quantity: Option<i64>) -> Option<LineItemId> {
        if self.line_items != LineItemsState::Ready {
            return None;
        }
        let id = self.ledger.add_product(product, quantity);
        self.sync_value();
        Some(id)
    }

    pub fn request_line_item_removal(&self, id: &LineItemId) -> Option<RemovalRequest> {
        if self.line_items != LineItemsState::Ready {
            return None;
        }
        self.ledger.request_removal(id)
    }

    pub fn confirm_line_item_removal(&mut self, request: RemovalRequest) -> Option<LineItem> {
        let removed = self.ledger.confirm_removal(request)?;
        self.sync_value();
        Some(removed)
    }

    /// Save-time check: title and stage must be non-empty.
    pub fn validate_for_save(&self) -> Result<()> {
        if self.fields.title.trim().is_empty() {
            return Err(DealDeskError::Validation("title is required".into()));
        }
        if self.fields.stage.trim().is_empty() {
            return Err(DealDeskError::Validation("stage is required".into()));
        }
        Ok(())
    }

    /// Ledger → value, one direction only.
    fn sync_value(&mut self) {
        let target =
            if self.ledger.is_empty() { self.manual_value } else { self.ledger.grand_total() };
        if target != self.fields.value {
            debug!(
                previous = %self.fields.value,
                value = %target,
                line_items = self.ledger.len(),
                "opportunity value recomputed"
            );
            self.fields.value = target;
        }
    }

    fn clear_contact_of(&mut self, field: OpportunityField) {
        let clears = matches!(
            (&self.fields.contact, field),
            (Some(ContactRef::Lead(_)), OpportunityField::Lead)
                | (Some(ContactRef::Customer(_)), OpportunityField::Customer)
        );
        if clears {
            self.fields.contact = None;
        }
    }
}
