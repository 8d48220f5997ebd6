//! SQLite product catalog.

use std::sync::Arc;

use async_trait::async_trait;
use dealdesk_core::ProductCatalog;
use dealdesk_domain::{Product, Result as DomainResult, TenantContext};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::instrument;

use super::manager::DbManager;
use super::pipeline_repository::decimal_column;
use crate::errors::{map_join_error, map_sql_error};

pub struct SqliteProductCatalog {
    db: Arc<DbManager>,
}

impl SqliteProductCatalog {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace a catalog entry for the tenant.
    #[instrument(skip(self, tenant, product), fields(tenant_id = %tenant.tenant_id, product_id = %product.id))]
    pub async fn upsert_product(&self, tenant: &TenantContext, product: &Product) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant.tenant_id.clone();
        let product = product.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO products (id, tenant_id, name, price, active)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    price = excluded.price,
                    active = excluded.active
                 WHERE products.tenant_id = excluded.tenant_id",
                params![product.id, tenant_id, product.name, product.price.to_string(), product.active],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ProductCatalog for SqliteProductCatalog {
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn list_products(&self, tenant: &TenantContext) -> DomainResult<Vec<Product>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant.tenant_id.clone();

        task::spawn_blocking(move || -> DomainResult<Vec<Product>> {
            let conn = db.get_connection()?;
            query_active_products(&conn, &tenant_id)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    async fn find_product(&self, tenant: &TenantContext, product_id: &str) -> DomainResult<Option<Product>> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant.tenant_id.clone();
        let product_id = product_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Product>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, price, active FROM products
                 WHERE id = ?1 AND tenant_id = ?2 AND active = 1",
                params![product_id, tenant_id],
                map_product_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn query_active_products(conn: &Connection, tenant_id: &str) -> DomainResult<Vec<Product>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, price, active FROM products
             WHERE tenant_id = ?1 AND active = 1
             ORDER BY name COLLATE NOCASE",
        )
        .map_err(map_sql_error)?;

    let rows = stmt.query_map(params![tenant_id], map_product_row).map_err(map_sql_error)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_sql_error)
}

fn map_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product { id: row.get(0)?, name: row.get(1)?, price: decimal_column(row, 2)?, active: row.get(3)? })
}
