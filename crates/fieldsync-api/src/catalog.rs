//! HttpRemoteCatalog - IRemoteCatalog implementation over the inspection API
//!
//! Wraps [`ApiClient`] and fulfils the [`IRemoteCatalog`] port contract for
//! the sync engine.
//!
//! ## Design Notes
//!
//! - Snapshot rows that fail domain validation are logged and skipped
//!   rather than failing the whole fetch. One malformed row must not turn
//!   a snapshot into a phase-level abort.
//! - The asset tree payload passes through untouched; the lenient walk
//!   over its shape belongs to the tree parser.
//! - No retries here. The engine decides what a failed call means.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use fieldsync_core::domain::newtypes::{EntityUid, FileId};
use fieldsync_core::domain::{Defect, DomainError, InspectionEvent, Project};
use fieldsync_core::ports::IRemoteCatalog;

use crate::client::ApiClient;

/// IRemoteCatalog implementation backed by the inspection HTTP API
pub struct HttpRemoteCatalog {
    client: ApiClient,
}

impl HttpRemoteCatalog {
    /// Creates a new HttpRemoteCatalog around an existing client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

/// Converts wire rows into domain entities, skipping rows that fail
/// validation
fn convert_rows<D, T>(rows: Vec<D>, kind: &str) -> Vec<T>
where
    T: TryFrom<D, Error = DomainError>,
{
    rows.into_iter()
        .filter_map(|dto| match T::try_from(dto) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!(kind, error = %e, "Skipping malformed snapshot row");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl IRemoteCatalog for HttpRemoteCatalog {
    async fn ping(&self) -> Result<()> {
        self.client.ping().await.context("Connectivity check failed")
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let rows = self
            .client
            .list_projects()
            .await
            .context("Failed to fetch project snapshot")?;
        Ok(convert_rows(rows, "project"))
    }

    async fn fetch_defects(&self) -> Result<Vec<Defect>> {
        let rows = self
            .client
            .list_defects()
            .await
            .context("Failed to fetch defect snapshot")?;
        Ok(convert_rows(rows, "defect"))
    }

    async fn fetch_events(&self) -> Result<Vec<InspectionEvent>> {
        let rows = self
            .client
            .list_events()
            .await
            .context("Failed to fetch inspection event snapshot")?;
        Ok(convert_rows(rows, "event"))
    }

    async fn fetch_asset_tree(&self, project_uid: &EntityUid) -> Result<Value> {
        self.client
            .asset_tree(project_uid.as_str())
            .await
            .with_context(|| format!("Failed to fetch asset tree for project {project_uid}"))
    }

    async fn resolve_download_url(&self, file_id: &FileId) -> Result<String> {
        self.client
            .download_url(file_id.as_str())
            .await
            .with_context(|| format!("Failed to resolve download URL for file {file_id}"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.client
            .download(url)
            .await
            .with_context(|| format!("Failed to download {url}"))
    }
}
