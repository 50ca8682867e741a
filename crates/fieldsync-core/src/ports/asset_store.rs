//! Asset store port (driven/secondary port)
//!
//! This module defines the interface for persisting digital asset records
//! and their download state, plus the many-to-many ownership relation
//! between projects and assets.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Asset records are keyed by tree node id. The same remote file may
//!   appear under several node ids; those records share a `FileId`, which
//!   is what URL resolution is keyed on.
//! - The store does not validate state transitions. Callers drive the
//!   [`AssetRecord`](crate::domain::AssetRecord) state machine in memory
//!   and mirror each step here; the in-flight guard in the download layer
//!   keeps a node from being driven by two tasks at once.
//! - `complete_asset` and `fail_asset` are the terminal writes and must
//!   each be a single atomic statement, so an observer never sees a
//!   completed status without its payload or a half-written failure.

use std::path::{Path, PathBuf};

use crate::domain::{
    asset::{AssetLeaf, AssetRecord, DownloadStatus},
    newtypes::{EntityUid, FileId, NodeId},
};

// ============================================================================
// AssetCounts struct
// ============================================================================

/// Asset row counts per download status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetCounts {
    /// Assets waiting for a download attempt
    pub pending: u64,
    /// Assets resolving their download URL
    pub resolving: u64,
    /// Assets currently transferring
    pub downloading: u64,
    /// Assets cached locally
    pub completed: u64,
    /// Assets whose last attempt failed
    pub failed: u64,
}

impl AssetCounts {
    /// Returns the total number of asset rows
    pub fn total(&self) -> u64 {
        self.pending + self.resolving + self.downloading + self.completed + self.failed
    }
}

// ============================================================================
// PurgedAssets struct
// ============================================================================

/// Result of removing a project's asset links
///
/// Assets still referenced by another project survive with their cache
/// intact; only orphans are deleted. `orphan_paths` lists the local files
/// the caller should remove from the content store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgedAssets {
    /// Ownership links removed for the project
    pub unlinked: u64,
    /// Orphaned asset rows hard-deleted
    pub deleted_assets: u64,
    /// Local content paths of the deleted assets
    pub orphan_paths: Vec<PathBuf>,
}

// ============================================================================
// IAssetStore trait
// ============================================================================

/// Port trait for persisted asset records and ownership links
///
/// ## Implementation Notes
///
/// - `upsert_asset` refreshes the metadata of an existing row (name,
///   parent, file id, type, size) without touching its download status or
///   payload, so re-parsing a tree never disturbs downloads.
/// - `replace_owner_assets` rewrites one project's membership rows in a
///   single transaction. An asset dropping to zero owners is left in
///   place; only `purge_owner_assets` removes rows.
/// - `reset_failed_assets` and `reset_asset` are the explicit re-queue
///   sweeps; the sync pass itself never re-queues a terminal asset.
#[async_trait::async_trait]
pub trait IAssetStore: Send + Sync {
    // --- Record maintenance ---

    /// Inserts a new Pending record or refreshes an existing row's metadata
    async fn upsert_asset(&self, leaf: &AssetLeaf) -> anyhow::Result<()>;

    /// Rewrites the set of assets owned by a project
    async fn replace_owner_assets(
        &self,
        owner: &EntityUid,
        node_ids: &[NodeId],
    ) -> anyhow::Result<()>;

    // --- Queries ---

    /// Retrieves an asset record by node id
    async fn get_asset(&self, node_id: &NodeId) -> anyhow::Result<Option<AssetRecord>>;

    /// Lists asset records in the given status
    async fn assets_with_status(&self, status: DownloadStatus)
        -> anyhow::Result<Vec<AssetRecord>>;

    /// Lists asset records owned by a project
    async fn assets_for_owner(&self, owner: &EntityUid) -> anyhow::Result<Vec<AssetRecord>>;

    /// Lists the projects referencing an asset
    async fn owners_of(&self, node_id: &NodeId) -> anyhow::Result<Vec<EntityUid>>;

    /// Counts asset rows per download status
    async fn asset_counts(&self) -> anyhow::Result<AssetCounts>;

    /// Returns true if the asset's content is cached locally
    async fn is_cached(&self, node_id: &NodeId) -> anyhow::Result<bool>;

    /// Returns a download URL already resolved for this file id, if any
    ///
    /// Lets sibling records sharing the file id skip a resolution round
    /// trip.
    async fn url_for_file(&self, file_id: &FileId) -> anyhow::Result<Option<String>>;

    // --- Download state writes ---

    /// Marks an asset as resolving its download URL
    async fn mark_resolving(&self, node_id: &NodeId) -> anyhow::Result<()>;

    /// Marks an asset as downloading and records its resolved URL
    async fn mark_downloading(&self, node_id: &NodeId, url: &str) -> anyhow::Result<()>;

    /// Atomically marks an asset completed with its payload
    ///
    /// Status, local path, and optional inline content are written in one
    /// statement.
    async fn complete_asset(
        &self,
        node_id: &NodeId,
        local_path: &Path,
        content: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Atomically marks an asset failed, leaving its payload untouched
    async fn fail_asset(&self, node_id: &NodeId) -> anyhow::Result<()>;

    // --- Explicit sweeps ---

    /// Re-queues every failed asset to Pending, returning how many
    async fn reset_failed_assets(&self) -> anyhow::Result<u64>;

    /// Re-queues one completed asset to Pending for a forced re-fetch
    async fn reset_asset(&self, node_id: &NodeId) -> anyhow::Result<()>;

    /// Removes a project's ownership links and hard-deletes orphaned assets
    async fn purge_owner_assets(&self, owner: &EntityUid) -> anyhow::Result<PurgedAssets>;
}
