#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use dealdesk_domain::{
    BackendKind, Config, DatabaseConfig, LoggingConfig, NewStage, Product, TenantContext,
};
use dealdesk_infra::SqliteProductCatalog;
use dealdesk_lib::AppContext;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Application context over a throwaway SQLite file.
pub struct TestContext {
    pub ctx: AppContext,
    /// Keep temporary directory alive for the lifetime of the context.
    _temp_dir: TempDir,
}

/// SQLite configuration rooted in `dir`. The database lives one directory
/// down so context startup has to create it.
pub fn sqlite_config(dir: &TempDir) -> Config {
    Config {
        backend: BackendKind::Sqlite,
        database: DatabaseConfig {
            path: dir.path().join("data").join("dealdesk.db").to_string_lossy().into_owned(),
            pool_size: 2,
        },
        remote: None,
        logging: LoggingConfig::default(),
    }
}

pub fn tenant() -> TenantContext {
    TenantContext::new("tenant-a").with_user("user-1")
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("valid decimal")
}

/// Fresh context with the default stages and two products seeded.
pub async fn setup_test_context() -> TestContext {
    let temp_dir = TempDir::new().expect("failed to create temporary directory");
    let ctx = AppContext::new_with_config(sqlite_config(&temp_dir), tenant())
        .await
        .expect("context should start");

    for (index, name) in ["Novo", "Proposta", "Ganho", "Perdido"].into_iter().enumerate() {
        let stage = NewStage {
            name: name.to_string(),
            color: "gray".to_string(),
            position: u32::try_from(index).expect("small index") + 1,
        };
        ctx.store.create_stage(&ctx.tenant, &stage).await.expect("stage should be created");
    }

    let db = Arc::clone(ctx.db.as_ref().expect("sqlite backend has a database"));
    let catalog = SqliteProductCatalog::new(db);
    for (id, name, price) in [("prod-lic", "Licença anual", "1200.00"), ("prod-sup", "Suporte", "150.50")] {
        let product = Product { id: id.into(), name: name.into(), price: dec(price), active: true };
        catalog.upsert_product(&ctx.tenant, &product).await.expect("product should be stored");
    }

    TestContext { ctx, _temp_dir: temp_dir }
}
