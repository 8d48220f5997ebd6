//! Opportunity editor commands
//!
//! One draft is open at a time. Every command returns the refreshed
//! [`DraftView`] so the editor can render without a second round trip.

use chrono::NaiveDate;
use dealdesk_core::{BoardController, DeleteRequest, LineItemsState, OpportunityDraft};
use dealdesk_domain::{
    DealDeskError, LineItem, Opportunity, OpportunityFields, Product, Result as DomainResult,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::utils::execute_logged;
use crate::AppContext;

/// Render model of the open draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftView {
    pub opportunity_id: Option<String>,
    pub fields: OpportunityFields,
    pub line_items: Vec<LineItem>,
    pub line_items_state: LineItemsState,
    pub grand_total: Decimal,
}

impl From<&OpportunityDraft> for DraftView {
    fn from(draft: &OpportunityDraft) -> Self {
        Self {
            opportunity_id: draft.opportunity_id().map(str::to_string),
            fields: draft.fields().clone(),
            line_items: draft.ledger().items().to_vec(),
            line_items_state: draft.line_items_state(),
            grand_total: draft.ledger().grand_total(),
        }
    }
}

fn open_draft(board: &BoardController) -> DomainResult<DraftView> {
    board
        .draft()
        .map(DraftView::from)
        .ok_or_else(|| DealDeskError::InvalidInput("no opportunity is open for editing".into()))
}

fn open_draft_mut(board: &mut BoardController) -> DomainResult<&mut OpportunityDraft> {
    board
        .draft_mut()
        .ok_or_else(|| DealDeskError::InvalidInput("no opportunity is open for editing".into()))
}

/// Start a new opportunity on the first stage, closing today.
pub async fn open_new_opportunity(ctx: &AppContext, today: NaiveDate) -> DomainResult<DraftView> {
    execute_logged("opportunities::open_new_opportunity", || async {
        let mut board = ctx.board().await;
        Ok(DraftView::from(board.open_for_create(today)))
    })
    .await
}

/// Open a persisted opportunity and fetch its line items.
///
/// A failed fetch leaves the draft open with `line_items_state` set to
/// `failed`; saving stays blocked until it is reopened.
pub async fn open_opportunity(ctx: &AppContext, opportunity_id: &str) -> DomainResult<DraftView> {
    execute_logged("opportunities::open_opportunity", || async {
        let load = ctx.board().await.open_for_edit(opportunity_id)?;
        let result = load.fetch(ctx.store.as_ref(), &ctx.tenant).await;

        let mut board = ctx.board().await;
        if !board.complete_line_item_load(load, result) {
            return Err(DealDeskError::Conflict(format!(
                "another opportunity was opened while {opportunity_id} was loading"
            )));
        }
        let view = open_draft(&board)?;
        if view.line_items_state == LineItemsState::Failed {
            info!(opportunity_id, "draft opened without line items");
        }
        Ok(view)
    })
    .await
}

/// Set a form field by name (`title`, `value`, `stage`, `close_date`,
/// `lead`, `customer`).
pub async fn set_draft_field(ctx: &AppContext, field: &str, value: &str) -> DomainResult<DraftView> {
    execute_logged("opportunities::set_draft_field", || async {
        let mut board = ctx.board().await;
        open_draft_mut(&mut board)?.set_field(field, value)?;
        open_draft(&board)
    })
    .await
}

/// Add a catalog product priced at its list price.
pub async fn add_product_line(
    ctx: &AppContext,
    product_id: &str,
    quantity: Option<i64>,
) -> DomainResult<DraftView> {
    execute_logged("opportunities::add_product_line", || async {
        let lookup = ctx.board().await.begin_product_line(product_id, quantity)?;
        let result = lookup.fetch(ctx.catalog.as_ref(), &ctx.tenant).await;

        let mut board = ctx.board().await;
        board.complete_product_line(lookup, result)?;
        open_draft(&board)
    })
    .await
}

/// Add a line item with an explicit unit price.
pub async fn add_line_item(
    ctx: &AppContext,
    product_id: &str,
    quantity: Option<i64>,
    unit_price: Option<Decimal>,
) -> DomainResult<DraftView> {
    execute_logged("opportunities::add_line_item", || async {
        let mut board = ctx.board().await;
        let draft = open_draft_mut(&mut board)?;
        if draft.line_items_state() != LineItemsState::Ready {
            return Err(DealDeskError::Conflict("line items are not ready".into()));
        }
        draft
            .add_line_item(Some(product_id), quantity, unit_price)
            .ok_or_else(|| DealDeskError::InvalidInput("a product must be selected".into()))?;
        open_draft(&board)
    })
    .await
}

/// First step of removing a line item: returns the item for the
/// confirmation prompt. The draft is unchanged until
/// [`confirm_line_item_removal`] names the same id.
pub async fn request_line_item_removal(ctx: &AppContext, line_item_id: &str) -> DomainResult<LineItem> {
    execute_logged("opportunities::request_line_item_removal", || async {
        ctx.board().await.request_line_item_removal(line_item_id)
    })
    .await
}

/// Remove the line item the user just confirmed.
pub async fn confirm_line_item_removal(ctx: &AppContext, line_item_id: &str) -> DomainResult<DraftView> {
    execute_logged("opportunities::confirm_line_item_removal", || async {
        let mut board = ctx.board().await;
        board.confirm_line_item_removal(line_item_id)?;
        open_draft(&board)
    })
    .await
}

pub async fn cancel_line_item_removal(ctx: &AppContext) {
    ctx.board().await.cancel_line_item_removal();
}

/// Persist the open draft with its line items and close it.
///
/// The board stays readable while the store writes; a second save in the
/// meantime is rejected with a conflict.
pub async fn save_draft(ctx: &AppContext) -> DomainResult<Opportunity> {
    execute_logged("opportunities::save_draft", || async {
        let request = ctx.board().await.begin_save()?;
        let result = request.execute(ctx.store.as_ref(), &ctx.tenant).await;
        ctx.board().await.complete_save(request, result)
    })
    .await
}

pub async fn close_draft(ctx: &AppContext) {
    ctx.board().await.close_draft();
}

pub async fn delete_opportunity(ctx: &AppContext, opportunity_id: &str) -> DomainResult<()> {
    execute_logged("opportunities::delete_opportunity", || async {
        let request = ctx.board().await.begin_delete(opportunity_id)?;
        commit_delete(ctx, request).await
    })
    .await
}

/// Delete the opportunity currently open in the editor.
pub async fn delete_draft(ctx: &AppContext) -> DomainResult<()> {
    execute_logged("opportunities::delete_draft", || async {
        let request = ctx.board().await.begin_delete_draft()?;
        commit_delete(ctx, request).await
    })
    .await
}

async fn commit_delete(ctx: &AppContext, request: DeleteRequest) -> DomainResult<()> {
    let result = request.execute(ctx.store.as_ref(), &ctx.tenant).await;
    ctx.board().await.complete_delete(request, result)
}

/// Active catalog products for the product picker.
pub async fn list_products(ctx: &AppContext) -> DomainResult<Vec<Product>> {
    execute_logged("opportunities::list_products", || async {
        ctx.catalog.list_products(&ctx.tenant).await
    })
    .await
}
