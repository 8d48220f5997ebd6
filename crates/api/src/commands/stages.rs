//! Stage management commands

use std::collections::HashSet;

use dealdesk_core::StageEdit;
use dealdesk_domain::{DealDeskError, Result as DomainResult, Stage};

use crate::utils::execute_logged;
use crate::AppContext;

pub async fn list_stages(ctx: &AppContext) -> DomainResult<Vec<Stage>> {
    execute_logged("stages::list_stages", || async { Ok(ctx.board().await.stages().to_vec()) }).await
}

/// Append a stage after the current last one.
pub async fn create_stage(ctx: &AppContext, name: &str, color: &str) -> DomainResult<Stage> {
    execute_logged("stages::create_stage", || async {
        if name.trim().is_empty() {
            return Err(DealDeskError::InvalidInput("stage name is required".into()));
        }
        let edit = ctx.board().await.begin_add_stage(name.trim(), color);
        commit_stage_edit(ctx, edit)
            .await?
            .ok_or_else(|| DealDeskError::Internal("store returned no stage for create".into()))
    })
    .await
}

pub async fn update_stage(ctx: &AppContext, stage_id: &str, name: &str, color: &str) -> DomainResult<Stage> {
    execute_logged("stages::update_stage", || async {
        if name.trim().is_empty() {
            return Err(DealDeskError::InvalidInput("stage name is required".into()));
        }
        let edit = ctx.board().await.begin_update_stage(stage_id, name.trim(), color)?;
        commit_stage_edit(ctx, edit)
            .await?
            .ok_or_else(|| DealDeskError::Internal(format!("stage {stage_id} vanished after update")))
    })
    .await
}

pub async fn delete_stage(ctx: &AppContext, stage_id: &str) -> DomainResult<()> {
    execute_logged("stages::delete_stage", || async {
        let edit = ctx.board().await.begin_delete_stage(stage_id)?;
        commit_stage_edit(ctx, edit).await.map(|_| ())
    })
    .await
}

/// Persist a new column order given as stage ids.
///
/// The ids must name every current stage exactly once. On failure the
/// stages are reloaded so the board shows whatever positions landed.
pub async fn reorder_stages(ctx: &AppContext, ordered_ids: &[String]) -> DomainResult<Vec<Stage>> {
    execute_logged("stages::reorder_stages", || async {
        let edit = {
            let board = ctx.board().await;
            let ordered = resolve_order(board.stages(), ordered_ids)?;
            board.begin_reorder_stages(ordered)
        };

        if let Err(err) = commit_stage_edit(ctx, edit).await {
            let stages = ctx.store.list_stages(&ctx.tenant).await;
            ctx.board().await.complete_stage_load(stages);
            return Err(err);
        }
        Ok(ctx.board().await.stages().to_vec())
    })
    .await
}

/// Write a stage edit without holding the board lock, then apply it.
async fn commit_stage_edit(ctx: &AppContext, edit: StageEdit) -> DomainResult<Option<Stage>> {
    let result = edit.commit(ctx.store.as_ref(), &ctx.tenant).await;
    ctx.board().await.complete_stage_edit(edit, result)
}

fn resolve_order(current: &[Stage], ordered_ids: &[String]) -> DomainResult<Vec<Stage>> {
    let unique: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
    if unique.len() != ordered_ids.len() || ordered_ids.len() != current.len() {
        return Err(DealDeskError::InvalidInput(format!(
            "expected each of the {} stages exactly once",
            current.len()
        )));
    }

    ordered_ids
        .iter()
        .map(|id| {
            current
                .iter()
                .find(|stage| &stage.id == id)
                .cloned()
                .ok_or_else(|| DealDeskError::InvalidInput(format!("unknown stage id '{id}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(id: &str, position: u32) -> Stage {
        Stage { id: id.into(), name: id.to_uppercase(), position, color: "gray".into() }
    }

    #[test]
    fn resolves_ids_into_stages_in_order() {
        let current = vec![stage("a", 1), stage("b", 2), stage("c", 3)];
        let ids = vec!["c".to_string(), "a".to_string(), "b".to_string()];

        let ordered = resolve_order(&current, &ids).unwrap();
        let names: Vec<&str> = ordered.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn rejects_partial_duplicate_or_unknown_ids() {
        let current = vec![stage("a", 1), stage("b", 2)];
        for ids in [vec!["a"], vec!["a", "a"], vec!["a", "z"]] {
            let ids: Vec<String> = ids.into_iter().map(String::from).collect();
            assert!(matches!(resolve_order(&current, &ids), Err(DealDeskError::InvalidInput(_))));
        }
    }
}
