//! Pipeline stage types

use serde::{Deserialize, Serialize};

/// A named, ordered column of the sales pipeline.
///
/// Positions are 1-based and contiguous within a tenant's active stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub position: u32,
    pub color: String,
}

impl Stage {
    /// Case-insensitive exact comparison against a stage name.
    pub fn matches_name(&self, name: &str) -> bool {
        stage_names_match(&self.name, name)
    }
}

/// Stage about to be created; the registry decides its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStage {
    pub name: String,
    pub color: String,
    pub position: u32,
}

/// Opportunities reference stages by name, compared without regard to case.
pub fn stage_names_match(left: &str, right: &str) -> bool {
    left == right || left.to_lowercase() == right.to_lowercase()
}
