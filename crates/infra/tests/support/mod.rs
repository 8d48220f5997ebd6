#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use dealdesk_domain::{NewStage, Product, TenantContext};
use dealdesk_infra::database::{DbManager, SqlitePipelineStore, SqliteProductCatalog};
use dealdesk_core::PipelineStore;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager =
            DbManager::new(temp_dir.path().join("dealdesk.db"), 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn store(&self) -> Arc<SqlitePipelineStore> {
        Arc::new(SqlitePipelineStore::new(Arc::clone(&self.manager)))
    }

    pub fn catalog(&self) -> Arc<SqliteProductCatalog> {
        Arc::new(SqliteProductCatalog::new(Arc::clone(&self.manager)))
    }

    /// Seed the four default stages in order.
    pub async fn seed_stages(&self, tenant: &TenantContext) {
        let store = self.store();
        for (position, name) in ["Novo", "Proposta", "Ganho", "Perdido"].into_iter().enumerate() {
            let stage = NewStage {
                name: name.to_string(),
                color: "gray".to_string(),
                position: u32::try_from(position).expect("small index") + 1,
            };
            store.create_stage(tenant, &stage).await.expect("stage should be created");
        }
    }

    pub async fn seed_product(&self, tenant: &TenantContext, id: &str, name: &str, price: &str) {
        let product = Product {
            id: id.to_string(),
            name: name.to_string(),
            price: Decimal::from_str(price).expect("valid decimal"),
            active: true,
        };
        self.catalog().upsert_product(tenant, &product).await.expect("product should be stored");
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn tenant() -> TenantContext {
    TenantContext::new("tenant-a").with_user("user-1")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}
