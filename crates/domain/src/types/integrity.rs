//! Data-integrity conditions surfaced to the user, never auto-healed.

use serde::{Deserialize, Serialize};

/// A condition the board reports instead of fixing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// The opportunity's stage matches no registry stage, so no column shows it.
    OrphanedOpportunity { opportunity_id: String, stage: String },
    /// A stage was deleted or renamed while opportunities still referenced it.
    StageOrphanedOpportunities { stage: String, opportunity_ids: Vec<String> },
}

impl std::fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrphanedOpportunity { opportunity_id, stage } => write!(
                f,
                "opportunity {opportunity_id} references stage '{stage}' which is not on the board"
            ),
            Self::StageOrphanedOpportunities { stage, opportunity_ids } => write!(
                f,
                "stage '{stage}' no longer exists but {} opportunities still reference it",
                opportunity_ids.len()
            ),
        }
    }
}
