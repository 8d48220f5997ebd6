//! Wire rows exchanged with the PostgREST endpoint.

use chrono::{DateTime, NaiveDate, Utc};
use dealdesk_domain::constants::DEFAULT_STAGE_COLOR;
use dealdesk_domain::{ContactRef, LineItem, LineItemId, Opportunity, OpportunityFields, Product, Stage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct StageRow {
    id: String,
    name: String,
    position: u32,
    #[serde(default)]
    color: Option<String>,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            name: row.name,
            position: row.position,
            color: row.color.unwrap_or_else(|| DEFAULT_STAGE_COLOR.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpportunityRow {
    id: String,
    title: String,
    #[serde(default)]
    value: Option<Decimal>,
    stage: String,
    #[serde(default)]
    close_date: Option<NaiveDate>,
    #[serde(default)]
    lead_id: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<OpportunityRow> for Opportunity {
    fn from(row: OpportunityRow) -> Self {
        Opportunity {
            id: row.id,
            title: row.title,
            value: row.value.unwrap_or(Decimal::ZERO),
            stage: row.stage,
            close_date: row.close_date,
            contact: ContactRef::from_columns(row.lead_id, row.customer_id),
            created_at: row.created_at,
        }
    }
}

/// Column payload for an opportunity write.
#[derive(Debug, Serialize)]
pub(crate) struct OpportunityPayload<'a> {
    title: &'a str,
    value: Decimal,
    stage: &'a str,
    close_date: Option<NaiveDate>,
    lead_id: Option<String>,
    customer_id: Option<String>,
}

impl<'a> From<&'a OpportunityFields> for OpportunityPayload<'a> {
    fn from(fields: &'a OpportunityFields) -> Self {
        let (lead_id, customer_id) = ContactRef::into_columns(fields.contact.as_ref());
        Self {
            title: &fields.title,
            value: fields.value,
            stage: &fields.stage,
            close_date: fields.close_date,
            lead_id,
            customer_id,
        }
    }
}

/// Line item as sent to the save procedure. Temporary ids go out as `null`
/// so the server assigns a real one.
#[derive(Debug, Serialize)]
pub(crate) struct LineItemPayload<'a> {
    id: Option<&'a str>,
    product_id: &'a str,
    quantity: u32,
    unit_price: Decimal,
}

impl<'a> From<&'a LineItem> for LineItemPayload<'a> {
    fn from(item: &'a LineItem) -> Self {
        Self {
            id: match &item.id {
                LineItemId::Temporary(_) => None,
                LineItemId::Persisted(id) => Some(id.as_str()),
            },
            product_id: &item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveOpportunityCall<'a> {
    pub p_tenant_id: &'a str,
    pub p_opportunity_id: Option<&'a str>,
    pub p_opportunity: OpportunityPayload<'a>,
    pub p_line_items: Vec<LineItemPayload<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedProduct {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LineItemRow {
    id: String,
    opportunity_id: String,
    product_id: String,
    quantity: u32,
    unit_price: Decimal,
    #[serde(default)]
    products: Option<EmbeddedProduct>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        LineItem {
            id: LineItemId::persisted(row.id),
            opportunity_id: Some(row.opportunity_id),
            product_id: row.product_id,
            product_name: row.products.map(|product| product.name),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductRow {
    id: String,
    name: String,
    price: Decimal,
    #[serde(default = "active_by_default")]
    active: bool,
}

fn active_by_default() -> bool {
    true
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product { id: row.id, name: row.name, price: row.price, active: row.active }
    }
}

/// PostgREST error body. Only the message is surfaced.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}
