//! Product catalog types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product a line item can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
