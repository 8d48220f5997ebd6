//! Board commands: loading, grouping and drag-and-drop

use dealdesk_core::{BoardController, BoardView, MoveOutcome, Notice};
use dealdesk_domain::{IntegrityWarning, Result as DomainResult};
use serde::Serialize;

use crate::utils::execute_logged;
use crate::AppContext;

/// Everything a board screen renders after a command.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub view: BoardView,
    pub integrity_warnings: Vec<IntegrityWarning>,
    /// Notices raised since the previous snapshot.
    pub notices: Vec<Notice>,
}

impl BoardSnapshot {
    pub(crate) fn capture(board: &mut BoardController) -> Self {
        Self {
            view: board.board_view(),
            integrity_warnings: board.integrity_warnings(),
            notices: board.drain_notices(),
        }
    }
}

/// Reload stages and opportunities from the store.
///
/// A stage failure still yields a snapshot (with no columns and an error
/// notice); an opportunity failure is returned as the error. The board lock
/// is not held while the store answers.
pub async fn load_board(ctx: &AppContext) -> DomainResult<BoardSnapshot> {
    execute_logged("board::load_board", || async {
        let stages = ctx.store.list_stages(&ctx.tenant).await;
        let opportunities = ctx.store.list_opportunities(&ctx.tenant).await;

        let mut board = ctx.board().await;
        board.complete_load(stages, opportunities)?;
        Ok(BoardSnapshot::capture(&mut board))
    })
    .await
}

/// Current in-memory board without touching the store.
pub async fn get_board(ctx: &AppContext) -> DomainResult<BoardSnapshot> {
    execute_logged("board::get_board", || async {
        let mut board = ctx.board().await;
        Ok(BoardSnapshot::capture(&mut board))
    })
    .await
}

/// Drop a card on a stage column.
pub async fn move_opportunity(
    ctx: &AppContext,
    opportunity_id: &str,
    target_stage: &str,
) -> DomainResult<MoveOutcome> {
    execute_logged("board::move_opportunity", || async {
        let Some(stage_move) = ctx.board().await.begin_move(opportunity_id, target_stage)? else {
            return Ok(MoveOutcome::Unchanged);
        };
        let result = stage_move.commit(ctx.store.as_ref(), &ctx.tenant).await;
        Ok(ctx.board().await.complete_move(stage_move, result))
    })
    .await
}

pub async fn drain_notices(ctx: &AppContext) -> Vec<Notice> {
    ctx.board().await.drain_notices()
}
