//! Port interfaces for pipeline persistence
//!
//! These traits are the single collaborator boundary between the engine and
//! the remote store. Every call takes the tenant explicitly; adapters never
//! resolve it on their own.

use async_trait::async_trait;
use dealdesk_domain::{
    LineItem, NewStage, Opportunity, OpportunityFields, Product, Result, Stage, TenantContext,
};

/// Trait for persisting stages, opportunities and line items
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// List the tenant's stages ordered by ascending position
    async fn list_stages(&self, tenant: &TenantContext) -> Result<Vec<Stage>>;

    /// Create a stage at the position chosen by the caller
    async fn create_stage(&self, tenant: &TenantContext, stage: &NewStage) -> Result<Stage>;

    /// Rename or recolor a stage in place
    async fn update_stage(&self, tenant: &TenantContext, stage: &Stage) -> Result<()>;

    /// Write every stage's position as given.
    ///
    /// Best-effort and non-transactional: a failure may leave some positions
    /// written and others not.
    async fn reorder_stages(&self, tenant: &TenantContext, stages: &[Stage]) -> Result<()>;

    /// Delete a stage without touching opportunities that reference it
    async fn delete_stage(&self, tenant: &TenantContext, stage_id: &str) -> Result<()>;

    /// List all of the tenant's opportunities
    async fn list_opportunities(&self, tenant: &TenantContext) -> Result<Vec<Opportunity>>;

    /// Scalar stage update used by drag-and-drop
    async fn update_opportunity_stage(
        &self,
        tenant: &TenantContext,
        opportunity_id: &str,
        stage: &str,
    ) -> Result<()>;

    /// Upsert the scalar fields and replace the full line-item set atomically.
    ///
    /// Temporary line-item ids are inserts. Replacing with the same set twice
    /// leaves the same persisted set. Returns the opportunity id.
    async fn save_opportunity_with_line_items(
        &self,
        tenant: &TenantContext,
        opportunity_id: Option<&str>,
        fields: &OpportunityFields,
        line_items: &[LineItem],
    ) -> Result<String>;

    /// Hard-delete an opportunity and its line items
    async fn delete_opportunity(&self, tenant: &TenantContext, opportunity_id: &str)
        -> Result<()>;

    /// List the persisted line items of one opportunity
    async fn list_line_items(
        &self,
        tenant: &TenantContext,
        opportunity_id: &str,
    ) -> Result<Vec<LineItem>>;
}

/// Read-only access to the tenant's product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// List active products ordered by name
    async fn list_products(&self, tenant: &TenantContext) -> Result<Vec<Product>>;

    /// Look a product up by id
    async fn find_product(&self, tenant: &TenantContext, product_id: &str)
        -> Result<Option<Product>>;
}
