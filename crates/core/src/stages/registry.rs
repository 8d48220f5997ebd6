//! Stage registry - ordered pipeline stages for one tenant

use std::sync::Arc;

use dealdesk_domain::constants::FIRST_STAGE_POSITION;
use dealdesk_domain::{DealDeskError, NewStage, Result, Stage, TenantContext};
use tracing::{debug, info, warn};

use crate::pipeline::PipelineStore;

/// Cached, position-ordered view of the tenant's stages.
pub struct StageRegistry {
    store: Arc<dyn PipelineStore>,
    stages: Vec<Stage>,
}

impl StageRegistry {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store, stages: Vec::new() }
    }

    /// Stages from the last successful load, ordered by position.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn first_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    pub fn find_by_id(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.id == stage_id)
    }

    /// Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.matches_name(name))
    }

    /// Reload from the store and report failures to the caller.
    ///
    /// On error the cache is emptied so the board renders zero columns.
    pub async fn load(&mut self, tenant: &TenantContext) -> Result<&[Stage]> {
        let loaded = self.store.list_stages(tenant).await;
        self.apply_load(loaded)
    }

    /// Install the result of a `list_stages` call made elsewhere.
    pub fn apply_load(&mut self, loaded: Result<Vec<Stage>>) -> Result<&[Stage]> {
        match loaded {
            Ok(mut stages) => {
                stages.sort_by_key(|stage| stage.position);
                debug!(count = stages.len(), "stages loaded");
                self.stages = stages;
                Ok(&self.stages)
            }
            Err(err) => {
                self.stages.clear();
                Err(err)
            }
        }
    }

    /// Stages in ascending position; empty when the store fails.
    pub async fn list_stages(&mut self, tenant: &TenantContext) -> Vec<Stage> {
        match self.load(tenant).await {
            Ok(stages) => stages.to_vec(),
            Err(err) => {
                warn!(error = %err, tenant_id = %tenant.tenant_id, "failed to list stages");
                Vec::new()
            }
        }
    }

    /// Append a stage after the current last position.
    pub async fn add_stage(
        &mut self,
        tenant: &TenantContext,
        name: &str,
        color: &str,
    ) -> Result<Stage> {
        let new_stage = self.plan_add(name, color);
        let created = self.store.create_stage(tenant, &new_stage).await?;
        self.apply_created(created.clone());
        Ok(created)
    }

    /// The stage `add_stage` would create, positioned after the last one.
    pub fn plan_add(&self, name: &str, color: &str) -> NewStage {
        let position =
            self.stages.iter().map(|stage| stage.position).max().map_or(FIRST_STAGE_POSITION, |p| p + 1);
        NewStage { name: name.to_string(), color: color.to_string(), position }
    }

    pub fn apply_created(&mut self, created: Stage) {
        info!(stage_id = %created.id, position = created.position, "stage created");
        self.stages.push(created);
        self.stages.sort_by_key(|stage| stage.position);
    }

    /// Rename or recolor a stage in place. Returns the stage as it was
    /// before the update.
    pub async fn update_stage(
        &mut self,
        tenant: &TenantContext,
        stage_id: &str,
        name: &str,
        color: &str,
    ) -> Result<Stage> {
        let (previous, updated) = self.plan_update(stage_id, name, color)?;
        self.store.update_stage(tenant, &updated).await?;
        self.apply_update(updated);
        Ok(previous)
    }

    /// `(previous, updated)` for a rename or recolor of a cached stage.
    pub fn plan_update(&self, stage_id: &str, name: &str, color: &str) -> Result<(Stage, Stage)> {
        let previous = self.stages[self.index_of(stage_id)?].clone();
        let updated = Stage { name: name.to_string(), color: color.to_string(), ..previous.clone() };
        Ok((previous, updated))
    }

    pub fn apply_update(&mut self, updated: Stage) {
        match self.stages.iter_mut().find(|stage| stage.id == updated.id) {
            Some(slot) => {
                info!(stage_id = %updated.id, renamed = slot.name != updated.name, "stage updated");
                *slot = updated;
            }
            // Dropped by a reload while the write was in flight.
            None => debug!(stage_id = %updated.id, "updated stage no longer cached"),
        }
    }

    /// Remove a stage. Opportunities referencing it are left untouched.
    pub async fn delete_stage(&mut self, tenant: &TenantContext, stage_id: &str) -> Result<Stage> {
        let target = self.plan_delete(stage_id)?;
        self.store.delete_stage(tenant, stage_id).await?;
        self.apply_delete(stage_id);
        Ok(target)
    }

    pub fn plan_delete(&self, stage_id: &str) -> Result<Stage> {
        Ok(self.stages[self.index_of(stage_id)?].clone())
    }

    pub fn apply_delete(&mut self, stage_id: &str) -> Option<Stage> {
        let index = self.stages.iter().position(|stage| stage.id == stage_id)?;
        let removed = self.stages.remove(index);
        info!(stage_id, name = %removed.name, "stage deleted");
        Some(removed)
    }

    /// Persist a new stage order, rewriting positions to `index + 1`.
    ///
    /// The store applies the writes independently. On error the cache keeps
    /// the old order and the caller should reload to see what landed.
    pub async fn reorder_stages(
        &mut self,
        tenant: &TenantContext,
        ordered: Vec<Stage>,
    ) -> Result<&[Stage]> {
        let reordered = renumber(ordered);
        self.store.reorder_stages(tenant, &reordered).await?;
        self.apply_reorder(reordered);
        Ok(&self.stages)
    }

    pub fn apply_reorder(&mut self, reordered: Vec<Stage>) {
        debug!(count = reordered.len(), "stages reordered");
        self.stages = reordered;
    }

    fn index_of(&self, stage_id: &str) -> Result<usize> {
        self.stages
            .iter()
            .position(|stage| stage.id == stage_id)
            .ok_or_else(|| DealDeskError::NotFound(format!("stage {stage_id}")))
    }
}

/// Assign contiguous 1-based positions in list order.
pub fn renumber(ordered: Vec<Stage>) -> Vec<Stage> {
    ordered
        .into_iter()
        .zip(FIRST_STAGE_POSITION..)
        .map(|(stage, position)| Stage { position, ..stage })
        .collect()
}
