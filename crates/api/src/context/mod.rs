//! Application context - dependency injection container

use std::path::Path;
use std::sync::Arc;

use dealdesk_core::{BoardController, PipelineStore, ProductCatalog};
use dealdesk_domain::{BackendKind, Config, DatabaseConfig, DealDeskError, Result, TenantContext};
use dealdesk_infra::errors::map_join_error;
use dealdesk_infra::{config, DbManager, RestPipelineStore, SqlitePipelineStore, SqliteProductCatalog};
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

/// Type alias for pipeline store trait object
type DynPipelineStore = dyn PipelineStore + 'static;

/// Type alias for product catalog trait object
type DynProductCatalog = dyn ProductCatalog + 'static;

/// Application context - holds the configured adapters and the board.
pub struct AppContext {
    pub config: Config,
    pub tenant: TenantContext,
    /// Present only for the SQLite backend.
    pub db: Option<Arc<DbManager>>,
    pub store: Arc<DynPipelineStore>,
    pub catalog: Arc<DynProductCatalog>,
    board: Mutex<BoardController>,
}

impl AppContext {
    /// Build a context from configuration found in the environment or a
    /// config file.
    pub async fn new(tenant: TenantContext) -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config, tenant).await
    }

    pub async fn new_with_config(config: Config, tenant: TenantContext) -> Result<Self> {
        if tenant.tenant_id.trim().is_empty() {
            return Err(DealDeskError::Config("tenant id must not be empty".into()));
        }

        let (store, catalog, db) = match config.backend {
            BackendKind::Sqlite => {
                let db = open_database(&config.database).await?;
                let store: Arc<DynPipelineStore> = Arc::new(SqlitePipelineStore::new(Arc::clone(&db)));
                let catalog: Arc<DynProductCatalog> = Arc::new(SqliteProductCatalog::new(Arc::clone(&db)));
                (store, catalog, Some(db))
            }
            BackendKind::Rest => {
                let remote = config
                    .remote
                    .as_ref()
                    .ok_or_else(|| DealDeskError::Config("backend \"rest\" requires remote settings".into()))?;
                let rest = Arc::new(RestPipelineStore::new(remote)?);
                let store: Arc<DynPipelineStore> = rest.clone();
                let catalog: Arc<DynProductCatalog> = rest;
                (store, catalog, None)
            }
        };

        let board = BoardController::new(Arc::clone(&store), tenant.clone()).with_catalog(Arc::clone(&catalog));
        info!(backend = %config.backend, tenant_id = %tenant.tenant_id, "application context ready");

        Ok(Self { config, tenant, db, store, catalog, board: Mutex::new(board) })
    }

    /// Exclusive access to the board for one command.
    pub async fn board(&self) -> MutexGuard<'_, BoardController> {
        self.board.lock().await
    }

    /// Check that the configured backend answers.
    pub async fn health_check(&self) -> Result<()> {
        match &self.db {
            Some(db) => {
                let db = Arc::clone(db);
                tokio::task::spawn_blocking(move || db.health_check()).await.map_err(map_join_error)?
            }
            None => self.store.list_stages(&self.tenant).await.map(|_| ()),
        }
    }
}

/// Open the SQLite file and apply the schema off the async runtime.
async fn open_database(config: &DatabaseConfig) -> Result<Arc<DbManager>> {
    if let Some(parent) = Path::new(&config.path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DealDeskError::Config(format!("Failed to create database directory {}: {}", parent.display(), e))
        })?;
    }

    let config = config.clone();
    tokio::task::spawn_blocking(move || -> Result<Arc<DbManager>> {
        let db = DbManager::from_config(&config)?;
        db.run_migrations()?;
        Ok(Arc::new(db))
    })
    .await
    .map_err(map_join_error)?
}

/// Tenant from `DEALDESK_TENANT_ID`, plus optional `DEALDESK_USER_ID` and
/// `DEALDESK_ACCESS_TOKEN`.
pub fn tenant_from_env() -> Result<TenantContext> {
    let tenant_id = std::env::var("DEALDESK_TENANT_ID")
        .map_err(|_| DealDeskError::Config("Missing required environment variable: DEALDESK_TENANT_ID".into()))?;

    let mut tenant = TenantContext::new(tenant_id);
    if let Ok(user_id) = std::env::var("DEALDESK_USER_ID") {
        tenant = tenant.with_user(user_id);
    }
    if let Ok(token) = std::env::var("DEALDESK_ACCESS_TOKEN") {
        tenant = tenant.with_access_token(token);
    }
    Ok(tenant)
}
