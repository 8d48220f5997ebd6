//! Opportunity types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Which kind of record the primary contact points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Lead,
    Customer,
}

impl_domain_status_conversions!(ContactKind {
    Lead => "lead",
    Customer => "customer",
});

/// Primary contact of an opportunity: a lead or a customer, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContactRef {
    Lead(String),
    Customer(String),
}

impl ContactRef {
    pub fn kind(&self) -> ContactKind {
        match self {
            Self::Lead(_) => ContactKind::Lead,
            Self::Customer(_) => ContactKind::Customer,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Lead(id) | Self::Customer(id) => id,
        }
    }

    /// Split into `(lead_id, customer_id)` column values.
    pub fn into_columns(contact: Option<&Self>) -> (Option<String>, Option<String>) {
        match contact {
            Some(Self::Lead(id)) => (Some(id.clone()), None),
            Some(Self::Customer(id)) => (None, Some(id.clone())),
            None => (None, None),
        }
    }

    /// Rebuild from `(lead_id, customer_id)` columns.
    ///
    /// Rows written by other clients may carry both; the customer wins since
    /// a converted lead keeps its old reference around.
    pub fn from_columns(lead_id: Option<String>, customer_id: Option<String>) -> Option<Self> {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        match (non_blank(lead_id), non_blank(customer_id)) {
            (_, Some(customer)) => Some(Self::Customer(customer)),
            (Some(lead), None) => Some(Self::Lead(lead)),
            (None, None) => None,
        }
    }
}

/// Scalar fields written by the atomic save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityFields {
    pub title: String,
    pub value: Decimal,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactRef>,
}

impl OpportunityFields {
    /// Defaults for a brand-new opportunity.
    pub fn new_default(stage: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            value: Decimal::ZERO,
            stage: stage.into(),
            close_date: Some(today),
            contact: None,
        }
    }
}

/// A persisted sales deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub value: Decimal,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactRef>,
    /// Server-assigned; absent for rows saved during this session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Opportunity {
    /// Build the in-memory record for a freshly saved draft.
    pub fn from_fields(id: impl Into<String>, fields: OpportunityFields) -> Self {
        Self {
            id: id.into(),
            title: fields.title,
            value: fields.value,
            stage: fields.stage,
            close_date: fields.close_date,
            contact: fields.contact,
            created_at: None,
        }
    }

    pub fn fields(&self) -> OpportunityFields {
        OpportunityFields {
            title: self.title.clone(),
            value: self.value,
            stage: self.stage.clone(),
            close_date: self.close_date,
            contact: self.contact.clone(),
        }
    }

    /// Overwrite the scalar fields, keeping id and created timestamp.
    pub fn apply_fields(&mut self, fields: OpportunityFields) {
        self.title = fields.title;
        self.value = fields.value;
        self.stage = fields.stage;
        self.close_date = fields.close_date;
        self.contact = fields.contact;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_serializes_as_kind_and_id() {
        let json = serde_json::to_value(ContactRef::Customer("cus-9".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "customer", "id": "cus-9"}));
    }

    #[test]
    fn contact_columns_prefer_customer_and_skip_blanks() {
        assert_eq!(
            ContactRef::from_columns(Some("lead-1".into()), Some("cus-1".into())),
            Some(ContactRef::Customer("cus-1".into()))
        );
        assert_eq!(
            ContactRef::from_columns(Some("lead-1".into()), Some("  ".into())),
            Some(ContactRef::Lead("lead-1".into()))
        );
        assert_eq!(ContactRef::from_columns(None, None), None);
    }

    #[test]
    fn contact_columns_split() {
        let lead = ContactRef::Lead("lead-7".into());
        assert_eq!(ContactRef::into_columns(Some(&lead)), (Some("lead-7".into()), None));
        assert_eq!(ContactRef::into_columns(None), (None, None));
    }

    #[test]
    fn default_fields_start_empty_on_given_stage() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let fields = OpportunityFields::new_default("Novo", today);

        assert_eq!(fields.title, "");
        assert_eq!(fields.value, Decimal::ZERO);
        assert_eq!(fields.stage, "Novo");
        assert_eq!(fields.close_date, Some(today));
        assert!(fields.contact.is_none());
    }
}
