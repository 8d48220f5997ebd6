//! # DealDesk API
//!
//! Application layer - commands and the `dealdesk` entry point.
//!
//! This crate contains:
//! - Commands a board UI drives (board, stages, opportunity editor)
//! - Application context (dependency injection)
//! - Command logging helpers
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the configured backend into a single `BoardController`

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
