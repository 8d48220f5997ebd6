//! # DealDesk Core
//!
//! Pipeline engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - Persistence ports (`PipelineStore`, `ProductCatalog`)
//! - Stage registry
//! - Line-item ledger and opportunity draft
//! - Board controller and its command objects
//!
//! ## Architecture Principles
//! - Only depends on `dealdesk-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod board;
pub mod draft;
pub mod ledger;
pub mod pipeline;
pub mod stages;

pub use board::{
    BoardColumn, BoardController, BoardView, DeleteRequest, LineItemLoad, MoveOutcome, Notice,
    NoticeLevel, ProductLookup, SaveRequest, StageEdit, StageMove,
};
pub use draft::{LineItemsState, OpportunityDraft, OpportunityField};
pub use ledger::{LineItemLedger, RemovalRequest};
pub use pipeline::{PipelineStore, ProductCatalog};
pub use stages::StageRegistry;
