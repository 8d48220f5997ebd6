//! Domain types and models
//!
//! Pipeline stages, opportunities and their line items, plus the tenant
//! context passed to every persistence call.

pub mod integrity;
pub mod line_item;
pub mod opportunity;
pub mod product;
pub mod stage;
pub mod tenant;

pub use integrity::IntegrityWarning;
pub use line_item::{LineItem, LineItemId};
pub use opportunity::{ContactKind, ContactRef, Opportunity, OpportunityFields};
pub use product::Product;
pub use stage::{stage_names_match, NewStage, Stage};
pub use tenant::TenantContext;
