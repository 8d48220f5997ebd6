//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Stage registry
pub const FIRST_STAGE_POSITION: u32 = 1;
pub const DEFAULT_STAGE_COLOR: &str = "gray";

// Line items
pub const TEMPORARY_LINE_ITEM_PREFIX: &str = "tmp-";
pub const DEFAULT_LINE_ITEM_QUANTITY: u32 = 1;

// Configuration defaults
pub const DEFAULT_DB_PATH: &str = "dealdesk.db";
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_REMOTE_MAX_ATTEMPTS: usize = 1;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Date format shared by adapters and the generic field setter
pub const CLOSE_DATE_FORMAT: &str = "%Y-%m-%d";
