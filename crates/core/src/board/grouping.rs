//! Column grouping and aggregates

use dealdesk_domain::{stage_names_match, IntegrityWarning, Opportunity, Stage};
use rust_decimal::Decimal;
use serde::Serialize;

/// One board column: a stage and the cards currently on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub stage: Stage,
    pub opportunities: Vec<Opportunity>,
    pub total_value: Decimal,
}

/// Snapshot of the whole board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
    /// Cards whose stage matches no column.
    pub orphaned: Vec<Opportunity>,
    /// Sum over visible columns only.
    pub total_value: Decimal,
}

/// Opportunities whose stage equals `stage_name`, ignoring case.
pub fn by_stage<'a>(opportunities: &'a [Opportunity], stage_name: &str) -> Vec<&'a Opportunity> {
    opportunities.iter().filter(|opp| stage_names_match(&opp.stage, stage_name)).collect()
}

pub fn column_total(opportunities: &[Opportunity], stage_name: &str) -> Decimal {
    by_stage(opportunities, stage_name).into_iter().map(|opp| opp.value).sum()
}

/// Cards that would not show up in any column.
pub fn orphaned<'a>(stages: &[Stage], opportunities: &'a [Opportunity]) -> Vec<&'a Opportunity> {
    opportunities
        .iter()
        .filter(|opp| !stages.iter().any(|stage| stage.matches_name(&opp.stage)))
        .collect()
}

pub fn orphan_warnings(stages: &[Stage], opportunities: &[Opportunity]) -> Vec<IntegrityWarning> {
    orphaned(stages, opportunities)
        .into_iter()
        .map(|opp| IntegrityWarning::OrphanedOpportunity {
            opportunity_id: opp.id.clone(),
            stage: opp.stage.clone(),
        })
        .collect()
}

pub fn build_view(stages: &[Stage], opportunities: &[Opportunity]) -> BoardView {
    let columns: Vec<BoardColumn> = stages
        .iter()
        .map(|stage| {
            let cards: Vec<Opportunity> =
                by_stage(opportunities, &stage.name).into_iter().cloned().collect();
            let total_value = cards.iter().map(|opp| opp.value).sum();
            BoardColumn { stage: stage.clone(), opportunities: cards, total_value }
        })
        .collect();

    let total_value = columns.iter().map(|column| column.total_value).sum();
    let orphaned = orphaned(stages, opportunities).into_iter().cloned().collect();

    BoardView { columns, orphaned, total_value }
}
