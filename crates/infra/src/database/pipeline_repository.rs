//! SQLite-backed pipeline store.
//!
//! Implements `PipelineStore` on top of [`DbManager`]. Every call runs its SQL
//! inside `spawn_blocking` and is scoped to the caller's tenant.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dealdesk_core::PipelineStore;
use dealdesk_domain::constants::CLOSE_DATE_FORMAT;
use dealdesk_domain::{
    ContactRef, DealDeskError, LineItem, LineItemId, NewStage, Opportunity, OpportunityFields,
    Result as DomainResult, Stage, TenantContext,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use tokio::task;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::{map_join_error, map_sql_error};

/// Pipeline store persisted in a local SQLite file.
pub struct SqlitePipelineStore {
    db: Arc<DbManager>,
}

impl SqlitePipelineStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Run `op` on a pooled connection off the async runtime.
    async fn with_connection<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            op(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl PipelineStore for SqlitePipelineStore {
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_stages(&self, tenant: &TenantContext) -> DomainResult<Vec<Stage>> {
        let tenant_id = tenant.tenant_id.clone();
        self.with_connection(move |conn| query_stages(conn, &tenant_id)).await
    }

    #[instrument(skip(self, tenant, stage), fields(tenant_id = %tenant.tenant_id, name = %stage.name))]
    async fn create_stage(&self, tenant: &TenantContext, stage: &NewStage) -> DomainResult<Stage> {
        let tenant_id = tenant.tenant_id.clone();
        let stage = stage.clone();
        self.with_connection(move |conn| insert_stage(conn, &tenant_id, stage)).await
    }

    #[instrument(skip(self, tenant, stage), fields(tenant_id = %tenant.tenant_id, stage_id = %stage.id))]
    async fn update_stage(&self, tenant: &TenantContext, stage: &Stage) -> DomainResult<()> {
        let tenant_id = tenant.tenant_id.clone();
        let stage = stage.clone();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE pipeline_stages SET name = ?1, color = ?2 WHERE id = ?3 AND tenant_id = ?4",
                    params![stage.name, stage.color, stage.id, tenant_id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, "stage", &stage.id)
        })
        .await
    }

    #[instrument(skip(self, tenant, stages), fields(tenant_id = %tenant.tenant_id, count = stages.len()))]
    async fn reorder_stages(&self, tenant: &TenantContext, stages: &[Stage]) -> DomainResult<()> {
        let tenant_id = tenant.tenant_id.clone();
        let stages = stages.to_vec();
        self.with_connection(move |conn| update_positions(conn, &tenant_id, &stages)).await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn delete_stage(&self, tenant: &TenantContext, stage_id: &str) -> DomainResult<()> {
        let tenant_id = tenant.tenant_id.clone();
        let stage_id = stage_id.to_string();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(
                    "DELETE FROM pipeline_stages WHERE id = ?1 AND tenant_id = ?2",
                    params![stage_id, tenant_id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, "stage", &stage_id)
        })
        .await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_opportunities(&self, tenant: &TenantContext) -> DomainResult<Vec<Opportunity>> {
        let tenant_id = tenant.tenant_id.clone();
        self.with_connection(move |conn| query_opportunities(conn, &tenant_id)).await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn update_opportunity_stage(
        &self,
        tenant: &TenantContext,
        opportunity_id: &str,
        stage: &str,
    ) -> DomainResult<()> {
        let tenant_id = tenant.tenant_id.clone();
        let opportunity_id = opportunity_id.to_string();
        let stage = stage.to_string();
        self.with_connection(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE opportunities SET stage = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4",
                    params![stage, now(), opportunity_id, tenant_id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, "opportunity", &opportunity_id)
        })
        .await
    }

    #[instrument(
        skip(self, tenant, fields, line_items),
        fields(tenant_id = %tenant.tenant_id, line_items = line_items.len())
    )]
    async fn save_opportunity_with_line_items(
        &self,
        tenant: &TenantContext,
        opportunity_id: Option<&str>,
        fields: &OpportunityFields,
        line_items: &[LineItem],
    ) -> DomainResult<String> {
        let tenant_id = tenant.tenant_id.clone();
        let opportunity_id = opportunity_id.map(str::to_string);
        let fields = fields.clone();
        let line_items = line_items.to_vec();
        self.with_connection(move |conn| {
            save_with_line_items(conn, &tenant_id, opportunity_id.as_deref(), &fields, &line_items)
        })
        .await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn delete_opportunity(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<()> {
        let tenant_id = tenant.tenant_id.clone();
        let opportunity_id = opportunity_id.to_string();
        self.with_connection(move |conn| {
            // Line items go with it through ON DELETE CASCADE.
            let changed = conn
                .execute(
                    "DELETE FROM opportunities WHERE id = ?1 AND tenant_id = ?2",
                    params![opportunity_id, tenant_id],
                )
                .map_err(map_sql_error)?;
            ensure_changed(changed, "opportunity", &opportunity_id)
        })
        .await
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_line_items(&self, tenant: &TenantContext, opportunity_id: &str) -> DomainResult<Vec<LineItem>> {
        let tenant_id = tenant.tenant_id.clone();
        let opportunity_id = opportunity_id.to_string();
        self.with_connection(move |conn| query_line_items(conn, &tenant_id, &opportunity_id)).await
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn query_stages(conn: &Connection, tenant_id: &str) -> DomainResult<Vec<Stage>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, position, color FROM pipeline_stages
             WHERE tenant_id = ?1
             ORDER BY position, created_at",
        )
        .map_err(map_sql_error)?;

    let rows = stmt
        .query_map(params![tenant_id], |row| {
            Ok(Stage { id: row.get(0)?, name: row.get(1)?, position: row.get(2)?, color: row.get(3)? })
        })
        .map_err(map_sql_error)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
}

fn insert_stage(conn: &Connection, tenant_id: &str, stage: NewStage) -> DomainResult<Stage> {
    let id = new_id();
    conn.execute(
        "INSERT INTO pipeline_stages (id, tenant_id, name, position, color, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, tenant_id, stage.name, stage.position, stage.color, now()],
    )
    .map_err(map_sql_error)?;

    debug!(stage_id = %id, position = stage.position, "stage inserted");
    Ok(Stage { id, name: stage.name, position: stage.position, color: stage.color })
}

/// One independent UPDATE per stage, no transaction. Every stage is tried;
/// the error reports how many writes did not land.
fn update_positions(conn: &Connection, tenant_id: &str, stages: &[Stage]) -> DomainResult<()> {
    let mut failed = 0usize;

    for stage in stages {
        let result = conn.execute(
            "UPDATE pipeline_stages SET position = ?1 WHERE id = ?2 AND tenant_id = ?3",
            params![stage.position, stage.id, tenant_id],
        );
        match result {
            Ok(1) => {}
            Ok(_) => {
                failed += 1;
                warn!(stage_id = %stage.id, "stage position update matched no row");
            }
            Err(err) => {
                failed += 1;
                warn!(stage_id = %stage.id, error = %err, "stage position update failed");
            }
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

fn query_opportunities(conn: &Connection, tenant_id: &str) -> DomainResult<Vec<Opportunity>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, value, stage, close_date, lead_id, customer_id, created_at
             FROM opportunities
             WHERE tenant_id = ?1
             ORDER BY created_at, id",
        )
        .map_err(map_sql_error)?;

    let rows = stmt.query_map(params![tenant_id], map_opportunity_row).map_err(map_sql_error)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
}

fn map_opportunity_row(row: &Row<'_>) -> rusqlite::Result<Opportunity> {
    let close_date: Option<String> = row.get(4)?;
    let created_at: i64 = row.get(7)?;

    Ok(Opportunity {
        id: row.get(0)?,
        title: row.get(1)?,
        value: decimal_column(row, 2)?,
        stage: row.get(3)?,
        close_date: close_date.as_deref().map(|text| date_column(4, text)).transpose()?,
        contact: ContactRef::from_columns(row.get(5)?, row.get(6)?),
        created_at: DateTime::<Utc>::from_timestamp(created_at, 0),
    })
}

fn save_with_line_items(
    conn: &mut Connection,
    tenant_id: &str,
    opportunity_id: Option<&str>,
    fields: &OpportunityFields,
    line_items: &[LineItem],
) -> DomainResult<String> {
    let tx = conn.transaction().map_err(map_sql_error)?;
    let timestamp = now();
    let (lead_id, customer_id) = ContactRef::into_columns(fields.contact.as_ref());
    let close_date = fields.close_date.map(|date| date.format(CLOSE_DATE_FORMAT).to_string());

    let updated = match opportunity_id {
        Some(id) => tx
            .execute(
                "UPDATE opportunities
                 SET title = ?1, value = ?2, stage = ?3, close_date = ?4,
                     lead_id = ?5, customer_id = ?6, updated_at = ?7
                 WHERE id = ?8 AND tenant_id = ?9",
                params![
                    fields.title,
                    fields.value.to_string(),
                    fields.stage,
                    close_date,
                    lead_id,
                    customer_id,
                    timestamp,
                    id,
                    tenant_id
                ],
            )
            .map_err(map_sql_error)?,
        None => 0,
    };

    let id = match opportunity_id {
        Some(existing) if updated > 0 => existing.to_string(),
        _ => {
            let id = opportunity_id.map_or_else(new_id, str::to_string);
            tx.execute(
                "INSERT INTO opportunities
                    (id, tenant_id, title, value, stage, close_date, lead_id, customer_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    id,
                    tenant_id,
                    fields.title,
                    fields.value.to_string(),
                    fields.stage,
                    close_date,
                    lead_id,
                    customer_id,
                    timestamp
                ],
            )
            .map_err(map_sql_error)?;
            id
        }
    };

    tx.execute(
        "DELETE FROM opportunity_line_items WHERE opportunity_id = ?1 AND tenant_id = ?2",
        params![id, tenant_id],
    )
    .map_err(map_sql_error)?;

    {
        let mut insert = tx
            .prepare(
                "INSERT INTO opportunity_line_items
                    (id, tenant_id, opportunity_id, product_id, quantity, unit_price, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(map_sql_error)?;

        for item in line_items {
            let item_id = match &item.id {
                LineItemId::Temporary(_) => new_id(),
                LineItemId::Persisted(existing) => existing.clone(),
            };
            insert
                .execute(params![
                    item_id,
                    tenant_id,
                    id,
                    item.product_id,
                    item.quantity,
                    item.unit_price.to_string(),
                    timestamp
                ])
                .map_err(map_sql_error)?;
        }
    }

    tx.commit().map_err(map_sql_error)?;
    debug!(opportunity_id = %id, line_items = line_items.len(), "opportunity saved with line items");
    Ok(id)
}

fn query_line_items(conn: &Connection, tenant_id: &str, opportunity_id: &str) -> DomainResult<Vec<LineItem>> {
    let mut stmt = conn
        .prepare(
            "SELECT li.id, li.opportunity_id, li.product_id, p.name, li.quantity, li.unit_price
             FROM opportunity_line_items li
             LEFT JOIN products p ON p.id = li.product_id AND p.tenant_id = li.tenant_id
             WHERE li.opportunity_id = ?1 AND li.tenant_id = ?2
             ORDER BY li.rowid",
        )
        .map_err(map_sql_error)?;

    let rows = stmt
        .query_map(params![opportunity_id, tenant_id], |row| {
            Ok(LineItem {
                id: LineItemId::persisted(row.get::<_, String>(0)?),
                opportunity_id: row.get(1)?,
                product_id: row.get(2)?,
                product_name: row.get(3)?,
                quantity: row.get(4)?,
                unit_price: decimal_column(row, 5)?,
            })
        })
        .map_err(map_sql_error)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
}

// ============================================================================
// Column helpers
// ============================================================================

pub(crate) fn decimal_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(index)?;
    Decimal::from_str(text.trim())
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn date_column(index: usize, text: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, CLOSE_DATE_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn ensure_changed(changed: usize, entity: &str, id: &str) -> DomainResult<()> {
    if changed == 0 {
        return Err(DealDeskError::NotFound(format!("{entity} {id}")));
    }
    Ok(())
}

pub(crate) fn new_id() -> String {
    Uuid::now_v7().to_string()
}

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============================================================================
// Tests
// ============================================================================
