//! Command objects for the board's asynchronous actions
//!
//! Each action is split into a synchronous part the controller applies
//! immediately and a persistence call that may fail. The controller hands the
//! command out, the caller runs the call, and the outcome goes back into the
//! controller through the matching `complete_*` method.

use dealdesk_domain::{
    stage_names_match, DealDeskError, LineItem, NewStage, Opportunity, OpportunityFields, Product,
    Result, Stage, TenantContext,
};
use tracing::instrument;

use crate::pipeline::{PipelineStore, ProductCatalog};

/// Drag-and-drop reassignment of one card from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a stage move must be completed to clear its pending state"]
pub struct StageMove {
    opportunity_id: String,
    from: String,
    to: String,
}

impl StageMove {
    pub(crate) fn new(opportunity_id: String, from: String, to: String) -> Self {
        Self { opportunity_id, from, to }
    }

    pub fn opportunity_id(&self) -> &str {
        &self.opportunity_id
    }

    pub fn from_stage(&self) -> &str {
        &self.from
    }

    pub fn to_stage(&self) -> &str {
        &self.to
    }

    /// Optimistically point the card at the target stage.
    pub fn apply(&self, opportunities: &mut [Opportunity]) -> bool {
        self.retarget(opportunities, &self.to, None)
    }

    /// Persist the new stage.
    #[instrument(skip(self, store, tenant), fields(opportunity_id = %self.opportunity_id, to = %self.to))]
    pub async fn commit(&self, store: &dyn PipelineStore, tenant: &TenantContext) -> Result<()> {
        store
            .update_opportunity_stage(tenant, &self.opportunity_id, &self.to)
            .await
            .map_err(|err| DealDeskError::persistence("update opportunity stage", err))
    }

    /// Put the card back on its original stage, unless something else moved
    /// it in the meantime.
    pub fn rollback(&self, opportunities: &mut [Opportunity]) -> bool {
        self.retarget(opportunities, &self.from, Some(&self.to))
    }

    fn retarget(&self, opportunities: &mut [Opportunity], stage: &str, expected: Option<&str>) -> bool {
        let Some(card) = opportunities.iter_mut().find(|opp| opp.id == self.opportunity_id) else {
            return false;
        };
        if let Some(expected) = expected {
            if !stage_names_match(&card.stage, expected) {
                return false;
            }
        }
        card.stage = stage.to_string();
        true
    }
}

/// Snapshot of a validated draft, ready for the atomic save.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a save request must be completed to release the save lock"]
pub struct SaveRequest {
    pub(crate) opportunity_id: Option<String>,
    pub(crate) fields: OpportunityFields,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) generation: u64,
}

impl SaveRequest {
    pub fn opportunity_id(&self) -> Option<&str> {
        self.opportunity_id.as_deref()
    }

    pub fn fields(&self) -> &OpportunityFields {
        &self.fields
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Upsert the opportunity and replace its line items. Returns the id.
    #[instrument(skip_all, fields(opportunity_id = ?self.opportunity_id, line_items = self.line_items.len()))]
    pub async fn execute(&self, store: &dyn PipelineStore, tenant: &TenantContext) -> Result<String> {
        store
            .save_opportunity_with_line_items(
                tenant,
                self.opportunity_id.as_deref(),
                &self.fields,
                &self.line_items,
            )
            .await
            .map_err(|err| DealDeskError::persistence("save opportunity", err))
    }
}

/// Pending fetch of a persisted opportunity's line items.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "loaded line items only reach the draft through complete_line_item_load"]
pub struct LineItemLoad {
    pub(crate) opportunity_id: String,
    pub(crate) generation: u64,
}

impl LineItemLoad {
    pub fn opportunity_id(&self) -> &str {
        &self.opportunity_id
    }

    #[instrument(skip_all, fields(opportunity_id = %self.opportunity_id))]
    pub async fn fetch(&self, store: &dyn PipelineStore, tenant: &TenantContext) -> Result<Vec<LineItem>> {
        store
            .list_line_items(tenant, &self.opportunity_id)
            .await
            .map_err(|err| DealDeskError::persistence("list line items", err))
    }
}

/// Pending catalog lookup for a product line on the open draft.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "the product only reaches the draft through complete_product_line"]
pub struct ProductLookup {
    pub(crate) product_id: String,
    pub(crate) quantity: Option<i64>,
    pub(crate) generation: u64,
}

impl ProductLookup {
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    #[instrument(skip_all, fields(product_id = %self.product_id))]
    pub async fn fetch(&self, catalog: &dyn ProductCatalog, tenant: &TenantContext) -> Result<Option<Product>> {
        catalog
            .find_product(tenant, &self.product_id)
            .await
            .map_err(|err| DealDeskError::persistence("find product", err))
    }
}

/// Hard delete of one opportunity and its line items.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a delete must be completed to update the board"]
pub struct DeleteRequest {
    pub(crate) opportunity_id: String,
}

impl DeleteRequest {
    pub fn opportunity_id(&self) -> &str {
        &self.opportunity_id
    }

    #[instrument(skip_all, fields(opportunity_id = %self.opportunity_id))]
    pub async fn execute(&self, store: &dyn PipelineStore, tenant: &TenantContext) -> Result<()> {
        store.delete_opportunity(tenant, &self.opportunity_id).await
    }
}

/// A change to the stage list. The registry is only updated once the store
/// accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a stage edit must be completed to update the registry"]
pub enum StageEdit {
    Create(NewStage),
    Update { previous: Stage, updated: Stage },
    Delete(Stage),
    /// Stages already renumbered in their new order.
    Reorder(Vec<Stage>),
}

impl StageEdit {
    /// Verb used in logs and notices.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Create(_) => "create stage",
            Self::Update { .. } => "update stage",
            Self::Delete(_) => "delete stage",
            Self::Reorder(_) => "reorder stages",
        }
    }

    /// Persist the change. Only a create returns a stage: the one the store
    /// assigned an id to.
    #[instrument(skip_all, fields(operation = self.operation()))]
    pub async fn commit(&self, store: &dyn PipelineStore, tenant: &TenantContext) -> Result<Option<Stage>> {
        match self {
            Self::Create(new_stage) => store.create_stage(tenant, new_stage).await.map(Some),
            Self::Update { updated, .. } => store.update_stage(tenant, updated).await.map(|()| None),
            Self::Delete(stage) => store.delete_stage(tenant, &stage.id).await.map(|()| None),
            Self::Reorder(stages) => store.reorder_stages(tenant, stages).await.map(|()| None),
        }
    }
}
