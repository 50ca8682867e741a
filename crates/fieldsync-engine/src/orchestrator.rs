//! Phased sync orchestration
//!
//! The orchestrator owns the pipeline: it sequences the phases of a full
//! sync pass, publishes progress on a watch channel, isolates phase
//! failures into the run report, and exposes the explicit sweeps (retry,
//! re-fetch, destructive cleanup) that the sync pass itself never runs.
//!
//! Exclusivity is per operation kind: a second `run_full_sync` while one
//! is underway is rejected, but a retry sweep may run next to a full sync
//! (the per-node in-flight guard in the download layer keeps them off
//! the same assets). Cancellation is cooperative and observed between
//! phases and between downloads, never mid-row-write.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fieldsync_core::config::Config;
use fieldsync_core::domain::newtypes::{EntityUid, NodeId};
use fieldsync_core::domain::progress::{
    PhaseError, ReconcileStats, SyncPhase, SyncProgress, SyncReport,
};
use fieldsync_core::ports::{
    AssetCounts, CatalogCounts, IAssetStore, ICatalogStore, IContentStore, IRemoteCatalog,
    PurgedAssets, PurgedCatalog,
};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::downloads::{DownloadManager, DownloadStats};
use crate::reconciler::EntityReconciler;
use crate::tree;
use crate::EngineError;

// ============================================================================
// OpKind
// ============================================================================

/// Kinds of exclusive engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// A full phased sync pass
    FullSync,
    /// The failed-asset retry sweep
    RetryFailedAssets,
    /// A forced re-fetch of one completed asset
    RefetchAsset,
    /// Destructive removal of one project and its orphaned assets
    ProjectCleanup,
}

impl OpKind {
    /// Returns the operation name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::FullSync => "full sync",
            OpKind::RetryFailedAssets => "failed-asset retry",
            OpKind::RefetchAsset => "asset re-fetch",
            OpKind::ProjectCleanup => "project cleanup",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Holds an operation kind's exclusive slot until dropped
struct OpGuard {
    ops: Arc<DashMap<OpKind, ()>>,
    kind: OpKind,
}

impl OpGuard {
    fn acquire(ops: &Arc<DashMap<OpKind, ()>>, kind: OpKind) -> Result<Self, EngineError> {
        match ops.entry(kind) {
            Entry::Occupied(_) => Err(EngineError::OperationInFlight(kind)),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    ops: Arc::clone(ops),
                    kind,
                })
            }
        }
    }
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.ops.remove(&self.kind);
    }
}

// ============================================================================
// Result payloads
// ============================================================================

/// Live row counts for the status surface
#[derive(Debug, Clone, Copy)]
pub struct StatusSnapshot {
    /// Catalog rows per entity class
    pub catalog: CatalogCounts,
    /// Asset rows per download status
    pub assets: AssetCounts,
}

/// What a destructive project cleanup removed
#[derive(Debug, Clone)]
pub struct CleanupReport {
    /// Catalog rows hard-deleted
    pub catalog: PurgedCatalog,
    /// Asset links and orphaned rows removed
    pub assets: PurgedAssets,
    /// Cached content files removed from disk
    pub files_removed: u64,
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Sequences sync phases over the port traits and reports progress
pub struct SyncOrchestrator {
    remote: Arc<dyn IRemoteCatalog>,
    catalog: Arc<dyn ICatalogStore>,
    assets: Arc<dyn IAssetStore>,
    content: Arc<dyn IContentStore>,
    reconciler: EntityReconciler,
    downloads: DownloadManager,
    progress_tx: watch::Sender<SyncProgress>,
    /// Exclusive slots per operation kind
    ops: Arc<DashMap<OpKind, ()>>,
    /// Token observed by in-flight operations; replaced on each cancel
    /// request so later operations start fresh
    cancel: Mutex<CancellationToken>,
}

impl SyncOrchestrator {
    /// Wires an orchestrator over the given adapters
    pub fn new(
        remote: Arc<dyn IRemoteCatalog>,
        catalog: Arc<dyn ICatalogStore>,
        assets: Arc<dyn IAssetStore>,
        content: Arc<dyn IContentStore>,
        config: &Config,
    ) -> Self {
        let reconciler = EntityReconciler::new(Arc::clone(&catalog));
        let downloads = DownloadManager::new(
            Arc::clone(&remote),
            Arc::clone(&assets),
            Arc::clone(&content),
            &config.sync,
        );
        let (progress_tx, _) = watch::channel(SyncProgress::for_phase(SyncPhase::Init));

        Self {
            remote,
            catalog,
            assets,
            content,
            reconciler,
            downloads,
            progress_tx,
            ops: Arc::new(DashMap::new()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    // --- Observation surface ---

    /// Subscribes to the progress stream.
    ///
    /// The receiver always holds the latest snapshot; subscribers never
    /// block the engine.
    pub fn subscribe(&self) -> watch::Receiver<SyncProgress> {
        self.progress_tx.subscribe()
    }

    /// Returns true if the asset's content is cached locally
    pub async fn is_asset_cached(&self, node_id: &NodeId) -> Result<bool> {
        self.assets.is_cached(node_id).await
    }

    /// Snapshots the catalog and asset counts
    pub async fn status(&self) -> Result<StatusSnapshot> {
        let catalog = self
            .catalog
            .catalog_counts()
            .await
            .context("Failed to count catalog rows")?;
        let assets = self
            .assets
            .asset_counts()
            .await
            .context("Failed to count asset rows")?;
        Ok(StatusSnapshot { catalog, assets })
    }

    /// Requests cancellation of in-flight operations.
    ///
    /// Cooperative: running phases finish their current row or transfer
    /// first. Operations started after this call are unaffected.
    pub fn request_cancel(&self) {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        slot.cancel();
        *slot = CancellationToken::new();
        info!("Cancellation requested");
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // --- Sync pass ---

    /// Runs a full phased sync pass and returns its report.
    ///
    /// A failed connectivity probe aborts the pass before any entity
    /// phase. A failed entity phase is recorded in the report and the
    /// pass continues; per-row and per-asset failures are isolated
    /// further down. The report is `Ok` even for aborted and failed
    /// passes - `Err` here means the pass could not run at all.
    #[tracing::instrument(skip(self))]
    pub async fn run_full_sync(&self) -> Result<SyncReport> {
        let _guard = OpGuard::acquire(&self.ops, OpKind::FullSync)?;
        let cancel = self.current_token();

        let mut report = SyncReport::new();
        info!(run_id = %report.run_id(), "Starting full sync");
        self.emit_phase(SyncPhase::Init);

        self.emit_phase(SyncPhase::Ping);
        if let Err(err) = self.remote.ping().await {
            warn!(error = %format!("{err:#}"), "Connectivity check failed, aborting pass");
            report.add_error(PhaseError::new(SyncPhase::Ping, format!("{err:#}")));
            report.abort();
            let _ = self
                .progress_tx
                .send(SyncProgress::aborted("Sync aborted: server unreachable"));
            return Ok(report);
        }

        if self.bail_if_cancelled(&cancel, &mut report) {
            return Ok(report);
        }
        self.emit_phase(SyncPhase::SyncProjects);
        match self.sync_projects().await {
            Ok(stats) => report.set_projects(stats),
            Err(err) => record_phase_failure(&mut report, SyncPhase::SyncProjects, &err),
        }

        if self.bail_if_cancelled(&cancel, &mut report) {
            return Ok(report);
        }
        self.emit_phase(SyncPhase::SyncDefects);
        match self.sync_defects().await {
            Ok(stats) => report.set_defects(stats),
            Err(err) => record_phase_failure(&mut report, SyncPhase::SyncDefects, &err),
        }

        if self.bail_if_cancelled(&cancel, &mut report) {
            return Ok(report);
        }
        self.emit_phase(SyncPhase::SyncEvents);
        match self.sync_events().await {
            Ok(stats) => report.set_events(stats),
            Err(err) => record_phase_failure(&mut report, SyncPhase::SyncEvents, &err),
        }

        if self.bail_if_cancelled(&cancel, &mut report) {
            return Ok(report);
        }
        self.emit_phase(SyncPhase::SyncAssets);
        match self.sync_assets(&cancel).await {
            Ok(stats) => report.set_asset_counts(stats.total, stats.completed, stats.failed),
            Err(err) => record_phase_failure(&mut report, SyncPhase::SyncAssets, &err),
        }

        // A cancel that landed during the downloads still ends the pass
        // as cancelled, with the partial counters kept
        if self.bail_if_cancelled(&cancel, &mut report) {
            return Ok(report);
        }

        report.finish();
        self.emit_phase(SyncPhase::Done);
        info!(
            run_id = %report.run_id(),
            outcome = %report.outcome(),
            writes = report.total_writes(),
            "Sync pass finished"
        );
        Ok(report)
    }

    // --- Explicit sweeps ---

    /// Re-queues every failed asset and downloads the pending queue
    #[tracing::instrument(skip(self))]
    pub async fn retry_failed_assets(&self) -> Result<DownloadStats> {
        let _guard = OpGuard::acquire(&self.ops, OpKind::RetryFailedAssets)?;
        let cancel = self.current_token();

        let requeued = self
            .assets
            .reset_failed_assets()
            .await
            .context("Failed to re-queue failed assets")?;
        info!(requeued, "Failed assets re-queued");

        // The sweep also picks up assets a previous interrupted run left
        // pending
        self.downloads
            .download_pending(&cancel, &self.progress_tx)
            .await
    }

    /// Forces a re-fetch of one completed asset
    #[tracing::instrument(skip(self))]
    pub async fn refetch_asset(&self, node_id: &NodeId) -> Result<DownloadStats> {
        let _guard = OpGuard::acquire(&self.ops, OpKind::RefetchAsset)?;
        let cancel = self.current_token();

        self.assets
            .reset_asset(node_id)
            .await
            .with_context(|| format!("Failed to re-queue asset {node_id}"))?;
        info!(node_id = %node_id, "Asset re-queued for forced re-fetch");

        self.downloads
            .download_pending(&cancel, &self.progress_tx)
            .await
    }

    /// Destructively removes a project: catalog rows, asset links,
    /// orphaned asset rows, and their cached content files.
    ///
    /// Assets still referenced by another project survive untouched.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup_project(&self, uid: &EntityUid) -> Result<CleanupReport> {
        let _guard = OpGuard::acquire(&self.ops, OpKind::ProjectCleanup)?;

        let assets = self
            .assets
            .purge_owner_assets(uid)
            .await
            .with_context(|| format!("Failed to purge assets of project {uid}"))?;

        let mut files_removed = 0u64;
        for path in &assets.orphan_paths {
            match self.content.remove(path).await {
                Ok(()) => files_removed += 1,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to remove cached content file");
                }
            }
        }

        let catalog = self
            .catalog
            .purge_project(uid)
            .await
            .with_context(|| format!("Failed to purge catalog rows of project {uid}"))?;

        info!(
            project = %uid,
            catalog_rows = catalog.total(),
            unlinked = assets.unlinked,
            deleted_assets = assets.deleted_assets,
            files_removed,
            "Project purged"
        );

        Ok(CleanupReport {
            catalog,
            assets,
            files_removed,
        })
    }

    // --- Phase bodies ---

    async fn sync_projects(&self) -> Result<ReconcileStats> {
        let snapshot = self
            .remote
            .fetch_projects()
            .await
            .context("Project snapshot fetch failed")?;
        self.reconciler.reconcile_projects(snapshot).await
    }

    async fn sync_defects(&self) -> Result<ReconcileStats> {
        let snapshot = self
            .remote
            .fetch_defects()
            .await
            .context("Defect snapshot fetch failed")?;
        self.reconciler.reconcile_defects(snapshot).await
    }

    async fn sync_events(&self) -> Result<ReconcileStats> {
        let snapshot = self
            .remote
            .fetch_events()
            .await
            .context("Event snapshot fetch failed")?;
        self.reconciler.reconcile_events(snapshot).await
    }

    /// Refreshes asset records from each live project's tree, then
    /// downloads the pending queue
    async fn sync_assets(&self, cancel: &CancellationToken) -> Result<DownloadStats> {
        let projects = self
            .catalog
            .list_projects(false)
            .await
            .context("Failed to list projects for asset refresh")?;

        for stored in &projects {
            if cancel.is_cancelled() {
                info!("Cancellation observed, skipping remaining asset trees");
                break;
            }
            let project_uid = stored.record().uid().clone();
            match self.remote.fetch_asset_tree(&project_uid).await {
                Ok(payload) => self.refresh_project_assets(&project_uid, &payload).await,
                Err(err) => {
                    // Tree fetch failure skips this project's refresh; its
                    // existing records and links stay as they were
                    warn!(
                        project = %project_uid,
                        error = %format!("{err:#}"),
                        "Asset tree fetch failed, project skipped"
                    );
                }
            }
        }

        self.downloads
            .download_pending(cancel, &self.progress_tx)
            .await
    }

    /// Upserts a project's parsed leaves and rewrites its ownership links
    async fn refresh_project_assets(&self, project_uid: &EntityUid, payload: &Value) {
        let leaves = tree::parse(payload);
        if leaves.is_empty() {
            debug!(project = %project_uid, "No downloadable assets in tree");
        }

        let mut node_ids = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            match self.assets.upsert_asset(leaf).await {
                Ok(()) => node_ids.push(leaf.node_id.clone()),
                Err(err) => {
                    warn!(node_id = %leaf.node_id, error = %err, "Asset upsert failed, leaf skipped");
                }
            }
        }

        if let Err(err) = self
            .assets
            .replace_owner_assets(project_uid, &node_ids)
            .await
        {
            warn!(project = %project_uid, error = %err, "Failed to rewrite asset ownership");
        } else {
            debug!(project = %project_uid, assets = node_ids.len(), "Project assets refreshed");
        }
    }

    // --- Plumbing ---

    fn emit_phase(&self, phase: SyncPhase) {
        let progress = SyncProgress::for_phase(phase);
        debug!(phase = %phase, fraction = progress.fraction(), "Entering sync phase");
        let _ = self.progress_tx.send(progress);
    }

    /// Finishes the report as cancelled if cancellation was requested
    fn bail_if_cancelled(&self, cancel: &CancellationToken, report: &mut SyncReport) -> bool {
        if !cancel.is_cancelled() {
            return false;
        }
        info!("Cancellation observed between phases, stopping pass");
        report.cancel();
        let _ = self.progress_tx.send(SyncProgress::aborted("Sync cancelled"));
        true
    }
}

fn record_phase_failure(report: &mut SyncReport, phase: SyncPhase, err: &anyhow::Error) {
    warn!(phase = %phase, error = %format!("{err:#}"), "Sync phase failed, pass continues");
    report.add_error(PhaseError::new(phase, format!("{err:#}")));
}
