//! CLI command implementations

pub mod cleanup;
pub mod config;
pub mod retry;
pub mod status;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fieldsync_api::{ApiClient, HttpRemoteCatalog};
use fieldsync_core::config::Config;
use fieldsync_core::ports::{IAssetStore, ICatalogStore, IContentStore, IRemoteCatalog};
use fieldsync_engine::SyncOrchestrator;
use fieldsync_store::{DatabasePool, FsContentStore, SqliteStore};

/// Builds the orchestrator over the real adapters.
///
/// Opens and migrates the SQLite catalog, prepares the content
/// directory, and constructs the authenticated API client from the
/// loaded configuration.
pub(crate) async fn build_orchestrator(config: &Config) -> Result<SyncOrchestrator> {
    let pool = DatabasePool::new(&config.storage.database_path)
        .await
        .context("Failed to open catalog database")?;
    let store = Arc::new(SqliteStore::new(pool.pool().clone()));

    let content = Arc::new(
        FsContentStore::new(config.storage.content_dir.clone())
            .context("Failed to prepare content directory")?,
    );

    let client = ApiClient::new(
        config.api.base_url.clone(),
        config.api.auth_token.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )
    .context("Failed to build API client")?;
    let remote = Arc::new(HttpRemoteCatalog::new(client));

    Ok(SyncOrchestrator::new(
        remote as Arc<dyn IRemoteCatalog>,
        store.clone() as Arc<dyn ICatalogStore>,
        store as Arc<dyn IAssetStore>,
        content as Arc<dyn IContentStore>,
        config,
    ))
}
