//! In-memory `PipelineStore` with call recording and failure injection

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use dealdesk_core::{PipelineStore, ProductCatalog};
use dealdesk_domain::{
    DealDeskError, LineItem, LineItemId, NewStage, Opportunity, OpportunityFields, Product,
    Result as DomainResult, Stage, TenantContext,
};

#[derive(Default)]
struct State {
    stages: Vec<Stage>,
    opportunities: Vec<Opportunity>,
    line_items: HashMap<String, Vec<LineItem>>,
    products: Vec<Product>,
    failing: HashSet<&'static str>,
    failing_stage_ids: HashSet<String>,
    calls: Vec<&'static str>,
    tenants: Vec<String>,
    next_id: u64,
}

/// Mock store keyed by operation name (the trait method name).
#[derive(Default)]
pub struct InMemoryPipelineStore {
    state: Mutex<State>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stages(self, stages: Vec<Stage>) -> Self {
        self.state.lock().unwrap().stages = stages;
        self
    }

    pub fn with_opportunities(self, opportunities: Vec<Opportunity>) -> Self {
        self.state.lock().unwrap().opportunities = opportunities;
        self
    }

    pub fn with_line_items(self, opportunity_id: &str, items: Vec<LineItem>) -> Self {
        self.state.lock().unwrap().line_items.insert(opportunity_id.to_string(), items);
        self
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        self.state.lock().unwrap().products = products;
        self
    }

    /// Make every call to `operation` fail until [`Self::recover`].
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.remove(operation);
    }

    /// Make the reorder write for one stage fail.
    pub fn fail_reorder_of(&self, stage_id: &str) {
        self.state.lock().unwrap().failing_stage_ids.insert(stage_id.to_string());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|call| **call == operation).count()
    }

    pub fn tenants_seen(&self) -> Vec<String> {
        self.state.lock().unwrap().tenants.clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = self.state.lock().unwrap().stages.clone();
        stages.sort_by_key(|stage| stage.position);
        stages
    }

    pub fn opportunity(&self, id: &str) -> Option<Opportunity> {
        self.state.lock().unwrap().opportunities.iter().find(|opp| opp.id == id).cloned()
    }

    pub fn opportunities(&self) -> Vec<Opportunity> {
        self.state.lock().unwrap().opportunities.clone()
    }

    pub fn persisted_line_items(&self, opportunity_id: &str) -> Vec<LineItem> {
        self.state.lock().unwrap().line_items.get(opportunity_id).cloned().unwrap_or_default()
    }

    fn enter(&self, operation: &'static str, tenant: &TenantContext) -> DomainResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation);
        state.tenants.push(tenant.tenant_id.clone());
        if state.failing.contains(operation) {
            return Err(DealDeskError::Network(format!("{operation}: HTTP 503 Service Unavailable")));
        }
        Ok(state)
    }
}

/// Store-assigned ids carry a `new-` marker so they never collide with the
/// ids tests seed (`opp-1`, `st-1`, `li-1`).
fn next_id(state: &mut State, prefix: &str) -> String {
    state.next_id += 1;
    format!("new-{prefix}-{}", state.next_id)
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn list_stages(&self, tenant: &TenantContext) -> DomainResult<Vec<Stage>> {
        let state = self.enter("list_stages", tenant)?;
        let mut stages = state.stages.clone();
        stages.sort_by_key(|stage| stage.position);
        Ok(stages)
    }

    async fn create_stage(&self, tenant: &TenantContext, stage: &NewStage) -> DomainResult<Stage> {
        let mut state = self.enter("create_stage", tenant)?;
        let created = Stage {
            id: next_id(&mut state, "st"),
            name: stage.name.clone(),
            position: stage.position,
            color: stage.color.clone(),
        };
        state.stages.push(created.clone());
        Ok(created)
    }

    async fn update_stage(&self, tenant: &TenantContext, stage: &Stage) -> DomainResult<()> {
        let mut state = self.enter("update_stage", tenant)?;
        let existing = state
            .stages
            .iter_mut()
            .find(|s| s.id == stage.id)
            .ok_or_else(|| DealDeskError::NotFound(format!("stage {}", stage.id)))?;
        existing.name = stage.name.clone();
        existing.color = stage.color.clone();
        Ok(())
    }

    async fn reorder_stages(&self, tenant: &TenantContext, stages: &[Stage]) -> DomainResult<()> {
        let mut state = self.enter("reorder_stages", tenant)?;
        let mut failed = 0;
        for stage in stages {
            if state.failing_stage_ids.contains(&stage.id) {
                failed += 1;
                continue;
            }
            if let Some(existing) = state.stages.iter_mut().find(|s| s.id == stage.id) {
                existing.position = stage.position;
            }
        }
        if failed > 0 {
            return Err(DealDeskError::Database(format!(
                "{failed} of {} stage position updates failed",
                stages.len()
            )));
        }
        Ok(())
    }

    async fn delete_stage(&self, tenant: &TenantContext, stage_id: &str) -> DomainResult<()> {
        let mut state = self.enter("delete_stage", tenant)?;
        state.stages.retain(|stage| stage.id != stage_id);
        Ok(())
    }

    async fn list_opportunities(&self, tenant: &TenantContext) -> DomainResult<Vec<Opportunity>> {
        let state = self.enter("list_opportunities", tenant)?;
        Ok(state.opportunities.clone())
    }

    async fn update_opportunity_stage(
        &self,
        tenant: &TenantContext,
        opportunity_id: &str,
        stage: &str,
    ) -> DomainResult<()> {
        let mut state = self.enter("update_opportunity_stage", tenant)?;
        let opportunity = state
            .opportunities
            .iter_mut()
            .find(|opp| opp.id == opportunity_id)
            .ok_or_else(|| DealDeskError::NotFound(format!("opportunity {opportunity_id}")))?;
        opportunity.stage = stage.to_string();
        Ok(())
    }

    async fn save_opportunity_with_line_items(
        &self,
        tenant: &TenantContext,
        opportunity_id: Option<&str>,
        fields: &OpportunityFields,
        line_items: &[LineItem],
    ) -> DomainResult<String> {
        let mut state = self.enter("save_opportunity_with_line_items", tenant)?;
        let id = match opportunity_id {
            Some(id) => {
                let existing = state
                    .opportunities
                    .iter_mut()
                    .find(|opp| opp.id == id)
                    .ok_or_else(|| DealDeskError::NotFound(format!("opportunity {id}")))?;
                existing.apply_fields(fields.clone());
                id.to_string()
            }
            None => {
                let id = next_id(&mut state, "opp");
                state.opportunities.push(Opportunity::from_fields(id.clone(), fields.clone()));
                id
            }
        };

        let mut persisted = Vec::with_capacity(line_items.len());
        for item in line_items {
            let item_id = match &item.id {
                LineItemId::Temporary(_) => LineItemId::persisted(next_id(&mut state, "li")),
                LineItemId::Persisted(existing) => LineItemId::persisted(existing.clone()),
            };
            persisted.push(LineItem { id: item_id, opportunity_id: Some(id.clone()), ..item.clone() });
        }
        state.line_items.insert(id.clone(), persisted);
        Ok(id)
    }

    async fn delete_opportunity(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<()> {
        let mut state = self.enter("delete_opportunity", tenant)?;
        state.opportunities.retain(|opp| opp.id != opportunity_id);
        state.line_items.remove(opportunity_id);
        Ok(())
    }

    async fn list_line_items(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<Vec<LineItem>> {
        let state = self.enter("list_line_items", tenant)?;
        Ok(state.line_items.get(opportunity_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryPipelineStore {
    async fn list_products(&self, tenant: &TenantContext) -> DomainResult<Vec<Product>> {
        let state = self.enter("list_products", tenant)?;
        Ok(state.products.iter().filter(|product| product.active).cloned().collect())
    }

    async fn find_product(&self, tenant: &TenantContext, product_id: &str) -> DomainResult<Option<Product>> {
        let state = self.enter("find_product", tenant)?;
        Ok(state.products.iter().find(|product| product.active && product.id == product_id).cloned())
    }
}
