//! Shared test helpers for `dealdesk-core` integration tests.
//!
//! The in-memory store records every call and can be told to fail specific
//! operations, so board tests can exercise rollback and notice paths.

#![allow(dead_code)]

pub mod store;

use std::str::FromStr;

use chrono::NaiveDate;
use dealdesk_domain::{Opportunity, Product, Stage, TenantContext};
use rust_decimal::Decimal;

// Not every test binary drives the store.
#[allow(unused_imports)]
pub use store::InMemoryPipelineStore;

pub fn tenant() -> TenantContext {
    TenantContext::new("tenant-a").with_user("user-1")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn stage(id: &str, name: &str, position: u32) -> Stage {
    Stage { id: id.into(), name: name.into(), position, color: "gray".into() }
}

/// The default four-column pipeline.
pub fn default_stages() -> Vec<Stage> {
    vec![
        stage("st-1", "Novo", 1),
        stage("st-2", "Proposta", 2),
        stage("st-3", "Ganho", 3),
        stage("st-4", "Perdido", 4),
    ]
}

pub fn opportunity(id: &str, stage: &str, value: &str) -> Opportunity {
    Opportunity {
        id: id.into(),
        title: format!("Deal {id}"),
        value: dec(value),
        stage: stage.into(),
        close_date: None,
        contact: None,
        created_at: None,
    }
}

pub fn product(id: &str, name: &str, price: &str) -> Product {
    Product { id: id.into(), name: name.into(), price: dec(price), active: true }
}
