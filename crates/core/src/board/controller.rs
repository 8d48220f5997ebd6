//! Pipeline board controller
//!
//! Owns the in-memory opportunity list, the stage registry and the draft that
//! is open for editing. Every persistence failure is caught here and turned
//! into a [`Notice`]; the in-memory state never disagrees with what the user
//! sees.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::NaiveDate;
use dealdesk_domain::{
    stage_names_match, DealDeskError, IntegrityWarning, LineItem, LineItemId, Opportunity,
    OpportunityFields, Product, Result, Stage, TenantContext,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use super::commands::{DeleteRequest, LineItemLoad, ProductLookup, SaveRequest, StageEdit, StageMove};
use super::grouping::{self, BoardView};
use super::notices::Notice;
use crate::draft::{LineItemsState, OpportunityDraft};
use crate::ledger::RemovalRequest;
use crate::pipeline::{PipelineStore, ProductCatalog};
use crate::stages::{renumber, StageRegistry};

/// Result of a drag-and-drop move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The card already sat on the target stage.
    Unchanged,
    Moved,
    /// Persisting failed and the card went back to its original stage.
    RolledBack(DealDeskError),
}

pub struct BoardController {
    store: Arc<dyn PipelineStore>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    tenant: TenantContext,
    registry: StageRegistry,
    opportunities: Vec<Opportunity>,
    pending_moves: HashSet<String>,
    draft: Option<OpportunityDraft>,
    /// Bumped whenever the open draft changes; stale loads and saves compare
    /// against it.
    draft_generation: u64,
    /// Removal awaiting confirmation, tagged with the draft generation.
    pending_removal: Option<(RemovalRequest, u64)>,
    save_in_flight: bool,
    notices: VecDeque<Notice>,
    stage_warnings: Vec<IntegrityWarning>,
}

impl BoardController {
    pub fn new(store: Arc<dyn PipelineStore>, tenant: TenantContext) -> Self {
        Self {
            registry: StageRegistry::new(Arc::clone(&store)),
            store,
            catalog: None,
            tenant,
            opportunities: Vec::new(),
            pending_moves: HashSet::new(),
            draft: None,
            draft_generation: 0,
            pending_removal: None,
            save_in_flight: false,
            notices: VecDeque::new(),
            stage_warnings: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn store(&self) -> &dyn PipelineStore {
        self.store.as_ref()
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn stages(&self) -> &[Stage] {
        self.registry.stages()
    }

    pub fn opportunities(&self) -> &[Opportunity] {
        &self.opportunities
    }

    pub fn find_opportunity(&self, opportunity_id: &str) -> Option<&Opportunity> {
        self.opportunities.iter().find(|opp| opp.id == opportunity_id)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load stages and opportunities.
    ///
    /// A stage failure leaves the board with zero columns. An opportunity
    /// failure keeps the previous cards and is returned to the caller.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn load(&mut self) -> Result<()> {
        let stages = self.store.list_stages(&self.tenant).await;
        let opportunities = self.store.list_opportunities(&self.tenant).await;
        self.complete_load(stages, opportunities)
    }

    /// Install the results of `list_stages` and `list_opportunities` fetched
    /// by the caller.
    pub fn complete_load(
        &mut self,
        stages: Result<Vec<Stage>>,
        opportunities: Result<Vec<Opportunity>>,
    ) -> Result<()> {
        self.complete_stage_load(stages);

        match opportunities {
            Ok(opportunities) => {
                info!(count = opportunities.len(), "opportunities loaded");
                self.opportunities = opportunities;
            }
            Err(err) => {
                let err = DealDeskError::persistence("list opportunities", err);
                error!(error = %err, "failed to load opportunities");
                self.notices.push_back(Notice::error("Could not load opportunities"));
                return Err(err);
            }
        }

        for warning in grouping::orphan_warnings(self.registry.stages(), &self.opportunities) {
            warn!(%warning, "integrity warning");
        }
        Ok(())
    }

    /// Replace the stage list. A failed fetch empties it.
    pub fn complete_stage_load(&mut self, stages: Result<Vec<Stage>>) {
        if let Err(err) = self.registry.apply_load(stages) {
            error!(error = %err, "failed to load stages");
            self.notices.push_back(Notice::error("Could not load pipeline stages"));
        }
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    pub fn by_stage(&self, stage_name: &str) -> Vec<&Opportunity> {
        grouping::by_stage(&self.opportunities, stage_name)
    }

    pub fn column_total(&self, stage_name: &str) -> Decimal {
        grouping::column_total(&self.opportunities, stage_name)
    }

    pub fn board_view(&self) -> BoardView {
        grouping::build_view(self.registry.stages(), &self.opportunities)
    }

    /// Current orphaned cards plus stage deletions/renames that orphaned
    /// cards during this session.
    pub fn integrity_warnings(&self) -> Vec<IntegrityWarning> {
        let mut warnings = self.stage_warnings.clone();
        warnings.extend(grouping::orphan_warnings(self.registry.stages(), &self.opportunities));
        warnings
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // ------------------------------------------------------------------
    // Drag and drop
    // ------------------------------------------------------------------

    /// Start moving a card. Returns `None` when it already sits on the
    /// target stage; otherwise the card is moved in memory right away.
    pub fn begin_move(&mut self, opportunity_id: &str, target_stage: &str) -> Result<Option<StageMove>> {
        let card = self
            .find_opportunity(opportunity_id)
            .ok_or_else(|| DealDeskError::NotFound(format!("opportunity {opportunity_id}")))?;

        if self.pending_moves.contains(opportunity_id) {
            return Err(DealDeskError::Conflict(format!(
                "opportunity {opportunity_id} is already being moved"
            )));
        }

        if stage_names_match(&card.stage, target_stage) {
            debug!(opportunity_id, stage = %card.stage, "drop on current stage ignored");
            return Ok(None);
        }

        let target = self
            .registry
            .find_by_name(target_stage)
            .ok_or_else(|| DealDeskError::InvalidInput(format!("unknown stage '{target_stage}'")))?;

        let stage_move =
            StageMove::new(opportunity_id.to_string(), card.stage.clone(), target.name.clone());
        stage_move.apply(&mut self.opportunities);
        self.pending_moves.insert(opportunity_id.to_string());
        Ok(Some(stage_move))
    }

    /// Finish a move with the result of [`StageMove::commit`].
    pub fn complete_move(&mut self, stage_move: StageMove, result: Result<()>) -> MoveOutcome {
        self.pending_moves.remove(stage_move.opportunity_id());

        match result {
            Ok(()) => {
                info!(
                    opportunity_id = stage_move.opportunity_id(),
                    from = stage_move.from_stage(),
                    to = stage_move.to_stage(),
                    "opportunity moved"
                );
                MoveOutcome::Moved
            }
            Err(err) => {
                let err = DealDeskError::persistence("update opportunity stage", err);
                stage_move.rollback(&mut self.opportunities);
                warn!(
                    opportunity_id = stage_move.opportunity_id(),
                    restored = stage_move.from_stage(),
                    error = %err,
                    "stage move rolled back"
                );
                self.notices.push_back(Notice::error(format!(
                    "Could not move opportunity to {}",
                    stage_move.to_stage()
                )));
                MoveOutcome::RolledBack(err)
            }
        }
    }

    /// Optimistic move, persisted and resolved in one call.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn move_opportunity(&mut self, opportunity_id: &str, target_stage: &str) -> Result<MoveOutcome> {
        let Some(stage_move) = self.begin_move(opportunity_id, target_stage)? else {
            return Ok(MoveOutcome::Unchanged);
        };
        let result = stage_move.commit(self.store.as_ref(), &self.tenant).await;
        Ok(self.complete_move(stage_move, result))
    }

    // ------------------------------------------------------------------
    // Draft editing
    // ------------------------------------------------------------------

    pub fn draft(&self) -> Option<&OpportunityDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut OpportunityDraft> {
        self.draft.as_mut()
    }

    /// Open a fresh draft on the first stage.
    pub fn open_for_create(&mut self, today: NaiveDate) -> &OpportunityDraft {
        let default_stage = self.registry.first_stage().map(|stage| stage.name.clone()).unwrap_or_default();
        self.replace_draft(OpportunityDraft::open_for_create(&default_stage, today))
    }

    /// Open a persisted opportunity. Its line items arrive through the
    /// returned load.
    pub fn open_for_edit(&mut self, opportunity_id: &str) -> Result<LineItemLoad> {
        let opportunity = self
            .find_opportunity(opportunity_id)
            .ok_or_else(|| DealDeskError::NotFound(format!("opportunity {opportunity_id}")))?;
        let draft = OpportunityDraft::open_for_edit(opportunity);

        self.replace_draft(draft);
        Ok(LineItemLoad { opportunity_id: opportunity_id.to_string(), generation: self.draft_generation })
    }

    /// Hand the fetched line items to the draft. Returns false when the
    /// result belongs to a draft that is no longer open.
    pub fn complete_line_item_load(&mut self, load: LineItemLoad, result: Result<Vec<LineItem>>) -> bool {
        if load.generation != self.draft_generation {
            debug!(opportunity_id = %load.opportunity_id, "discarding stale line item load");
            return false;
        }
        let Some(draft) = self.draft.as_mut() else {
            return false;
        };

        match result {
            Ok(items) => {
                debug!(opportunity_id = %load.opportunity_id, count = items.len(), "line items loaded");
                draft.load_line_items(items);
            }
            Err(err) => {
                error!(opportunity_id = %load.opportunity_id, error = %err, "failed to load line items");
                draft.mark_line_items_failed();
                self.notices.push_back(Notice::error("Could not load line items"));
            }
        }
        true
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn open_for_edit_and_load(&mut self, opportunity_id: &str) -> Result<&OpportunityDraft> {
        let load = self.open_for_edit(opportunity_id)?;
        let result = load.fetch(self.store.as_ref(), &self.tenant).await;
        self.complete_line_item_load(load, result);
        self.draft
            .as_ref()
            .ok_or_else(|| DealDeskError::Internal("draft closed while loading line items".into()))
    }

    /// Discard the open draft without saving.
    pub fn close_draft(&mut self) {
        if self.draft.take().is_some() {
            self.draft_generation += 1;
        }
    }

    /// Add a catalog product as a line item of the open draft.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn add_product_line(&mut self, product_id: &str, quantity: Option<i64>) -> Result<LineItemId> {
        let lookup = self.begin_product_line(product_id, quantity)?;
        let catalog = self
            .catalog
            .clone()
            .ok_or_else(|| DealDeskError::Config("no product catalog configured".into()))?;
        let result = lookup.fetch(catalog.as_ref(), &self.tenant).await;
        self.complete_product_line(lookup, result)
    }

    pub fn begin_product_line(&mut self, product_id: &str, quantity: Option<i64>) -> Result<ProductLookup> {
        self.ready_draft()?;
        Ok(ProductLookup {
            product_id: product_id.to_string(),
            quantity,
            generation: self.draft_generation,
        })
    }

    /// Add the looked-up product. Fails with a conflict when another draft
    /// was opened while the catalog answered.
    pub fn complete_product_line(
        &mut self,
        lookup: ProductLookup,
        result: Result<Option<Product>>,
    ) -> Result<LineItemId> {
        let product = result?.ok_or_else(|| DealDeskError::NotFound(format!("product {}", lookup.product_id)))?;
        if lookup.generation != self.draft_generation {
            debug!(product_id = %lookup.product_id, "discarding product for a draft that is no longer open");
            return Err(DealDeskError::Conflict("the open opportunity changed while adding the product".into()));
        }

        let draft = self.ready_draft()?;
        draft
            .add_product(&product, lookup.quantity)
            .ok_or_else(|| DealDeskError::Conflict("line items are not ready".into()))
    }

    /// First half of a line item removal. Returns the item so the user can
    /// confirm; the ledger is untouched until
    /// [`Self::confirm_line_item_removal`].
    pub fn request_line_item_removal(&mut self, line_item_id: &str) -> Result<LineItem> {
        let generation = self.draft_generation;
        let draft = self.ready_draft()?;
        let item = draft
            .ledger()
            .items()
            .iter()
            .find(|item| item.id.as_str() == line_item_id)
            .cloned()
            .ok_or_else(|| DealDeskError::NotFound(format!("line item {line_item_id}")))?;
        let request = draft
            .request_line_item_removal(&item.id)
            .ok_or_else(|| DealDeskError::NotFound(format!("line item {line_item_id}")))?;

        self.pending_removal = Some((request, generation));
        Ok(item)
    }

    /// Remove the item named by the pending request. The id must match the
    /// one that was requested, on the same draft.
    pub fn confirm_line_item_removal(&mut self, line_item_id: &str) -> Result<LineItem> {
        let matches = match &self.pending_removal {
            None => {
                return Err(DealDeskError::InvalidInput("no line item removal is awaiting confirmation".into()));
            }
            Some((request, generation)) => {
                *generation == self.draft_generation && request.line_item_id().as_str() == line_item_id
            }
        };
        if !matches {
            return Err(DealDeskError::Conflict(format!(
                "line item {line_item_id} is not the removal awaiting confirmation"
            )));
        }

        let Some((request, _)) = self.pending_removal.take() else {
            return Err(DealDeskError::Internal("pending removal vanished".into()));
        };
        let draft = self.ready_draft()?;
        draft
            .confirm_line_item_removal(request)
            .ok_or_else(|| DealDeskError::NotFound(format!("line item {line_item_id}")))
    }

    pub fn cancel_line_item_removal(&mut self) {
        self.pending_removal = None;
    }

    fn ready_draft(&mut self) -> Result<&mut OpportunityDraft> {
        let draft = self
            .draft
            .as_mut()
            .ok_or_else(|| DealDeskError::InvalidInput("no opportunity is open for editing".into()))?;
        if draft.line_items_state() != LineItemsState::Ready {
            return Err(DealDeskError::Conflict("line items are not ready".into()));
        }
        Ok(draft)
    }

    fn replace_draft(&mut self, draft: OpportunityDraft) -> &OpportunityDraft {
        self.draft_generation += 1;
        self.draft.insert(draft)
    }

    // ------------------------------------------------------------------
    // Saving and deleting
    // ------------------------------------------------------------------

    /// Validate the open draft and lock saving until the request completes.
    pub fn begin_save(&mut self) -> Result<SaveRequest> {
        if self.save_in_flight {
            return Err(DealDeskError::Conflict("a save is already in progress".into()));
        }
        let draft = self
            .draft
            .as_ref()
            .ok_or_else(|| DealDeskError::InvalidInput("no opportunity is open for editing".into()))?;

        draft.validate_for_save()?;

        match draft.line_items_state() {
            LineItemsState::Ready => {}
            LineItemsState::Loading => {
                return Err(DealDeskError::Conflict("line items are still loading".into()));
            }
            LineItemsState::Failed => {
                return Err(DealDeskError::Conflict(
                    "line items failed to load; reopen the opportunity before saving".into(),
                ));
            }
        }

        let request = SaveRequest {
            opportunity_id: draft.opportunity_id().map(str::to_string),
            fields: draft.fields().clone(),
            line_items: draft.ledger().items().to_vec(),
            generation: self.draft_generation,
        };
        self.save_in_flight = true;
        Ok(request)
    }

    /// Finish a save with the result of [`SaveRequest::execute`].
    ///
    /// On success the card is upserted and the draft closes. On failure the
    /// draft stays open and an error notice is raised.
    pub fn complete_save(&mut self, request: SaveRequest, result: Result<String>) -> Result<Opportunity> {
        self.save_in_flight = false;

        let opportunity_id = match result {
            Ok(id) => id,
            Err(err) => {
                let err = DealDeskError::persistence("save opportunity", err);
                error!(opportunity_id = ?request.opportunity_id, error = %err, "save failed");
                self.notices.push_back(Notice::error("Could not save opportunity"));
                return Err(err);
            }
        };

        let saved = self.upsert_local(&opportunity_id, request.fields);
        info!(
            opportunity_id = %saved.id,
            created = request.opportunity_id.is_none(),
            line_items = request.line_items.len(),
            "opportunity saved"
        );

        if request.generation == self.draft_generation {
            self.close_draft();
        }
        self.notices.push_back(Notice::success(format!("Saved \"{}\"", saved.title)));
        Ok(saved)
    }

    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn save_draft(&mut self) -> Result<Opportunity> {
        let request = self.begin_save()?;
        let result = request.execute(self.store.as_ref(), &self.tenant).await;
        self.complete_save(request, result)
    }

    /// Hard-delete an opportunity and its line items.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn delete_opportunity(&mut self, opportunity_id: &str) -> Result<()> {
        let request = self.begin_delete(opportunity_id)?;
        let result = request.execute(self.store.as_ref(), &self.tenant).await;
        self.complete_delete(request, result)
    }

    pub fn begin_delete(&self, opportunity_id: &str) -> Result<DeleteRequest> {
        if opportunity_id.trim().is_empty() {
            return Err(DealDeskError::InvalidInput("opportunity id is required".into()));
        }
        Ok(DeleteRequest { opportunity_id: opportunity_id.to_string() })
    }

    /// Delete the opportunity open in the draft; unsaved drafts have nothing
    /// to delete.
    pub async fn delete_draft(&mut self) -> Result<()> {
        let request = self.begin_delete_draft()?;
        let result = request.execute(self.store.as_ref(), &self.tenant).await;
        self.complete_delete(request, result)
    }

    pub fn begin_delete_draft(&self) -> Result<DeleteRequest> {
        let opportunity_id = self
            .draft
            .as_ref()
            .ok_or_else(|| DealDeskError::InvalidInput("no opportunity is open for editing".into()))?
            .opportunity_id()
            .ok_or_else(|| DealDeskError::InvalidInput("opportunity has not been saved yet".into()))?;
        self.begin_delete(opportunity_id)
    }

    /// Drop the card and any draft open on it once the store confirms.
    pub fn complete_delete(&mut self, request: DeleteRequest, result: Result<()>) -> Result<()> {
        let opportunity_id = request.opportunity_id.as_str();
        if let Err(err) = result {
            let err = DealDeskError::persistence("delete opportunity", err);
            error!(opportunity_id, error = %err, "delete failed");
            self.notices.push_back(Notice::error("Could not delete opportunity"));
            return Err(err);
        }

        self.opportunities.retain(|opp| opp.id != opportunity_id);
        if self.draft.as_ref().and_then(OpportunityDraft::opportunity_id) == Some(opportunity_id) {
            self.close_draft();
        }
        info!(opportunity_id, "opportunity deleted");
        self.notices.push_back(Notice::success("Opportunity deleted"));
        Ok(())
    }

    fn upsert_local(&mut self, opportunity_id: &str, fields: OpportunityFields) -> Opportunity {
        match self.opportunities.iter_mut().find(|opp| opp.id == opportunity_id) {
            Some(existing) => {
                existing.apply_fields(fields);
                existing.clone()
            }
            None => {
                let created = Opportunity::from_fields(opportunity_id, fields);
                self.opportunities.push(created.clone());
                created
            }
        }
    }

    // ------------------------------------------------------------------
    // Stage management
    // ------------------------------------------------------------------

    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn add_stage(&mut self, name: &str, color: &str) -> Result<Stage> {
        let edit = self.begin_add_stage(name, color);
        let result = edit.commit(self.store.as_ref(), &self.tenant).await;
        self.complete_stage_edit(edit, result)?
            .ok_or_else(|| DealDeskError::Internal("store returned no stage for create".into()))
    }

    /// Rename or recolor a stage. Cards still on the old name are orphaned.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn update_stage(&mut self, stage_id: &str, name: &str, color: &str) -> Result<Stage> {
        let edit = self.begin_update_stage(stage_id, name, color)?;
        let result = edit.commit(self.store.as_ref(), &self.tenant).await;
        self.complete_stage_edit(edit, result)?
            .ok_or_else(|| DealDeskError::Internal(format!("stage {stage_id} vanished after update")))
    }

    /// Delete a stage. Its cards keep their stage name and become orphaned.
    #[instrument(skip(self), fields(tenant_id = %self.tenant.tenant_id))]
    pub async fn delete_stage(&mut self, stage_id: &str) -> Result<()> {
        let edit = self.begin_delete_stage(stage_id)?;
        let result = edit.commit(self.store.as_ref(), &self.tenant).await;
        self.complete_stage_edit(edit, result).map(|_| ())
    }

    /// Persist a new stage order. On failure the stages are reloaded so the
    /// board shows whatever actually landed.
    #[instrument(skip(self, ordered), fields(tenant_id = %self.tenant.tenant_id, count = ordered.len()))]
    pub async fn reorder_stages(&mut self, ordered: Vec<Stage>) -> Result<()> {
        let edit = self.begin_reorder_stages(ordered);
        let result = edit.commit(self.store.as_ref(), &self.tenant).await;
        if let Err(err) = self.complete_stage_edit(edit, result) {
            let stages = self.store.list_stages(&self.tenant).await;
            self.complete_stage_load(stages);
            return Err(err);
        }
        Ok(())
    }

    pub fn begin_add_stage(&self, name: &str, color: &str) -> StageEdit {
        StageEdit::Create(self.registry.plan_add(name, color))
    }

    pub fn begin_update_stage(&self, stage_id: &str, name: &str, color: &str) -> Result<StageEdit> {
        let (previous, updated) = self.registry.plan_update(stage_id, name, color)?;
        Ok(StageEdit::Update { previous, updated })
    }

    pub fn begin_delete_stage(&self, stage_id: &str) -> Result<StageEdit> {
        Ok(StageEdit::Delete(self.registry.plan_delete(stage_id)?))
    }

    pub fn begin_reorder_stages(&self, ordered: Vec<Stage>) -> StageEdit {
        StageEdit::Reorder(renumber(ordered))
    }

    /// Apply a committed stage edit to the registry. Returns the created or
    /// updated stage.
    ///
    /// A failed reorder leaves the old order cached; callers reload through
    /// [`Self::complete_stage_load`] to see which writes landed.
    pub fn complete_stage_edit(&mut self, edit: StageEdit, result: Result<Option<Stage>>) -> Result<Option<Stage>> {
        let created = match result {
            Ok(created) => created,
            Err(err) => return Err(self.stage_failure(edit.operation(), err)),
        };

        match edit {
            StageEdit::Create(_) => {
                let created = created
                    .ok_or_else(|| DealDeskError::Internal("store returned no stage for create".into()))?;
                self.registry.apply_created(created.clone());
                Ok(Some(created))
            }
            StageEdit::Update { previous, updated } => {
                self.registry.apply_update(updated.clone());
                if !stage_names_match(&previous.name, &updated.name) {
                    self.record_orphans(&previous.name);
                }
                Ok(Some(updated))
            }
            StageEdit::Delete(removed) => {
                self.registry.apply_delete(&removed.id);
                self.record_orphans(&removed.name);
                Ok(None)
            }
            StageEdit::Reorder(stages) => {
                self.registry.apply_reorder(stages);
                Ok(None)
            }
        }
    }

    fn stage_failure(&mut self, operation: &str, err: DealDeskError) -> DealDeskError {
        if matches!(err, DealDeskError::NotFound(_)) {
            return err;
        }
        let err = DealDeskError::persistence(operation, err);
        error!(operation, error = %err, "stage operation failed");
        self.notices.push_back(Notice::error(format!("Could not {operation}")));
        err
    }

    fn record_orphans(&mut self, stage_name: &str) {
        // Another stage may still carry the same name.
        if self.registry.find_by_name(stage_name).is_some() {
            return;
        }
        let opportunity_ids: Vec<String> =
            grouping::by_stage(&self.opportunities, stage_name).into_iter().map(|opp| opp.id.clone()).collect();
        if opportunity_ids.is_empty() {
            return;
        }

        let warning = IntegrityWarning::StageOrphanedOpportunities {
            stage: stage_name.to_string(),
            opportunity_ids,
        };
        warn!(%warning, "integrity warning");
        self.notices.push_back(Notice::warning(warning.to_string()));
        self.stage_warnings.push(warning);
    }
}
