//! Bounded-concurrency asset download manager
//!
//! Takes every asset the store reports as `Pending` and drives each one
//! through the download state machine: resolve a URL (or reuse one
//! already known for the same file id), transfer the content, write it
//! to the content store, and record completion atomically. Up to the
//! configured number of transfers run at once behind a semaphore.
//!
//! Two guards keep concurrent entry points honest:
//!
//! - A per-node in-flight map, shared between the full-sync and retry
//!   sweeps, so no node is ever driven by two tasks at once.
//! - URL resolution keyed by file id, cached per run and checked against
//!   previously resolved rows, so a file referenced by several nodes is
//!   resolved once.
//!
//! Failures mark the one asset `FAILED` and touch nothing else. There is
//! no retry here; re-queuing failed assets is an explicit, separate
//! sweep.

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fieldsync_core::config::SyncConfig;
use fieldsync_core::domain::asset::{AssetRecord, DownloadStatus};
use fieldsync_core::domain::newtypes::{FileId, NodeId};
use fieldsync_core::domain::progress::SyncProgress;
use fieldsync_core::ports::{IAssetStore, IContentStore, IRemoteCatalog};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// ============================================================================
// DownloadStats
// ============================================================================

/// Counters for one download sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Assets taken from the pending queue
    pub total: u64,
    /// Assets downloaded and cached
    pub completed: u64,
    /// Assets whose attempt failed and was recorded
    pub failed: u64,
    /// Assets skipped because another task already had them in flight
    pub skipped: u64,
}

/// How a single download task ended
enum TaskOutcome {
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

// ============================================================================
// DownloadManager
// ============================================================================

/// Drives pending assets through resolution, transfer, and persistence
#[derive(Clone)]
pub struct DownloadManager {
    remote: Arc<dyn IRemoteCatalog>,
    assets: Arc<dyn IAssetStore>,
    content: Arc<dyn IContentStore>,
    /// Nodes currently being driven, shared across entry points
    in_flight: Arc<DashMap<NodeId, ()>>,
    /// Bounds concurrent transfers
    limiter: Arc<Semaphore>,
    /// Lowercased file types eligible for the inline content cache
    inline_types: Arc<Vec<String>>,
    inline_max_bytes: u64,
}

impl DownloadManager {
    /// Creates a manager with the configured concurrency bound and
    /// inline-cache policy
    pub fn new(
        remote: Arc<dyn IRemoteCatalog>,
        assets: Arc<dyn IAssetStore>,
        content: Arc<dyn IContentStore>,
        sync_config: &SyncConfig,
    ) -> Self {
        let concurrency = sync_config.download_concurrency.max(1) as usize;
        let inline_types: Vec<String> = sync_config
            .inline_content_types
            .iter()
            .map(|t| t.to_ascii_lowercase())
            .collect();

        Self {
            remote,
            assets,
            content,
            in_flight: Arc::new(DashMap::new()),
            limiter: Arc::new(Semaphore::new(concurrency)),
            inline_types: Arc::new(inline_types),
            inline_max_bytes: sync_config.inline_content_max_bytes,
        }
    }

    /// Downloads every pending asset, reporting per-asset progress.
    ///
    /// Returns once all spawned tasks have settled. Cancellation is
    /// observed before each transfer starts; a transfer already underway
    /// runs to its end, so no row is ever left mid-write.
    #[tracing::instrument(skip_all)]
    pub async fn download_pending(
        &self,
        cancel: &CancellationToken,
        progress: &watch::Sender<SyncProgress>,
    ) -> Result<DownloadStats> {
        let pending = self
            .assets
            .assets_with_status(DownloadStatus::Pending)
            .await
            .context("Failed to list pending assets")?;

        let total = pending.len() as u64;
        let mut stats = DownloadStats {
            total,
            ..DownloadStats::default()
        };
        let _ = progress.send(SyncProgress::downloading(0, total));
        if pending.is_empty() {
            return Ok(stats);
        }

        let url_cache: Arc<DashMap<FileId, String>> = Arc::new(DashMap::new());
        let mut tasks = JoinSet::new();
        for record in pending {
            let manager = self.clone();
            let cancel = cancel.clone();
            let url_cache = Arc::clone(&url_cache);
            tasks.spawn(async move { manager.run_one(record, cancel, url_cache).await });
        }

        let mut done = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Completed) => stats.completed += 1,
                Ok(TaskOutcome::Failed) => stats.failed += 1,
                Ok(TaskOutcome::Skipped) => stats.skipped += 1,
                Ok(TaskOutcome::Cancelled) => {}
                Err(err) => {
                    stats.failed += 1;
                    error!(error = %err, "Download task aborted unexpectedly");
                }
            }
            done += 1;
            let _ = progress.send(SyncProgress::downloading(done, total));
        }

        info!(
            total = stats.total,
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            "Download sweep finished"
        );
        Ok(stats)
    }

    /// Runs one asset to a settled outcome
    async fn run_one(
        self,
        record: AssetRecord,
        cancel: CancellationToken,
        url_cache: Arc<DashMap<FileId, String>>,
    ) -> TaskOutcome {
        let node_id = record.node_id().clone();

        let _guard = match InFlightGuard::try_acquire(&self.in_flight, node_id.clone()) {
            Some(guard) => guard,
            None => {
                debug!(node_id = %node_id, "Asset already in flight, skipping");
                return TaskOutcome::Skipped;
            }
        };

        let _permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return TaskOutcome::Cancelled,
        };

        if cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        match self.process(&record, &url_cache).await {
            Ok(()) => TaskOutcome::Completed,
            Err(err) => {
                warn!(node_id = %node_id, error = %format!("{err:#}"), "Asset download failed");
                if let Err(mark_err) = self.assets.fail_asset(&node_id).await {
                    error!(node_id = %node_id, error = %mark_err, "Failed to record asset failure");
                }
                TaskOutcome::Failed
            }
        }
    }

    /// Resolution, transfer, and persistence for one asset.
    ///
    /// The domain record is driven through its state machine in memory
    /// and each step is mirrored to the store, so an illegal sequence
    /// fails here instead of corrupting a row.
    async fn process(&self, record: &AssetRecord, url_cache: &DashMap<FileId, String>) -> Result<()> {
        let mut asset = record.clone();
        let node_id = asset.node_id().clone();
        let file_id = asset.file_id().clone();

        let url = match self.known_url(&file_id, url_cache).await? {
            Some(url) => url,
            None => {
                asset.begin_resolving()?;
                self.assets
                    .mark_resolving(&node_id)
                    .await
                    .context("Failed to mark asset resolving")?;

                let resolved = self
                    .remote
                    .resolve_download_url(&file_id)
                    .await
                    .with_context(|| format!("URL resolution failed for file {file_id}"))?;
                url_cache.insert(file_id.clone(), resolved.clone());
                resolved
            }
        };

        asset.begin_download(url.clone())?;
        self.assets
            .mark_downloading(&node_id, &url)
            .await
            .context("Failed to mark asset downloading")?;

        let bytes = self
            .remote
            .download(&url)
            .await
            .with_context(|| format!("Content download failed for node {node_id}"))?;

        let local_path = self
            .content
            .write(&node_id, asset.file_type(), &bytes)
            .await
            .context("Failed to write asset content")?;

        let inline = inline_copy(
            &self.inline_types,
            self.inline_max_bytes,
            asset.file_type(),
            &bytes,
        );
        asset.complete(local_path.clone(), inline.clone())?;
        self.assets
            .complete_asset(&node_id, &local_path, inline.as_deref())
            .await
            .context("Failed to record asset completion")?;

        debug!(node_id = %node_id, bytes = bytes.len(), "Asset cached");
        Ok(())
    }

    /// Finds a URL already resolved for this file id, from this run or a
    /// previous one
    async fn known_url(
        &self,
        file_id: &FileId,
        url_cache: &DashMap<FileId, String>,
    ) -> Result<Option<String>> {
        if let Some(url) = url_cache.get(file_id) {
            return Ok(Some(url.value().clone()));
        }
        let stored = self
            .assets
            .url_for_file(file_id)
            .await
            .context("Failed to look up stored download URL")?;
        if let Some(url) = stored.as_ref() {
            url_cache.insert(file_id.clone(), url.clone());
        }
        Ok(stored)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Holds a node's in-flight slot until dropped
struct InFlightGuard {
    map: Arc<DashMap<NodeId, ()>>,
    node_id: NodeId,
}

impl InFlightGuard {
    /// Claims the node, or returns None if another task holds it
    fn try_acquire(map: &Arc<DashMap<NodeId, ()>>, node_id: NodeId) -> Option<Self> {
        match map.entry(node_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    map: Arc::clone(map),
                    node_id,
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.node_id);
    }
}

/// Inline copy of a small structured payload, or None when the asset
/// does not qualify
fn inline_copy(
    inline_types: &[String],
    max_bytes: u64,
    file_type: Option<&str>,
    bytes: &[u8],
) -> Option<String> {
    let file_type = file_type?.to_ascii_lowercase();
    if !inline_types.iter().any(|t| *t == file_type) {
        return None;
    }
    if bytes.len() as u64 > max_bytes {
        return None;
    }
    // Binary payloads mislabeled with a structured type stay on disk only
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    mod inline_copy_tests {
        use super::*;

        #[test]
        fn test_eligible_type_within_cap() {
            let inline = inline_copy(&types(&["json", "txt"]), 1024, Some("json"), b"{\"a\":1}");
            assert_eq!(inline.as_deref(), Some("{\"a\":1}"));
        }

        #[test]
        fn test_type_not_listed() {
            assert_eq!(inline_copy(&types(&["json"]), 1024, Some("pdf"), b"data"), None);
            assert_eq!(inline_copy(&types(&["json"]), 1024, None, b"data"), None);
        }

        #[test]
        fn test_type_match_is_case_insensitive() {
            // Configured types are lowercased at construction; the asset's
            // type is folded here
            let inline = inline_copy(&types(&["csv"]), 1024, Some("CSV"), b"a,b");
            assert_eq!(inline.as_deref(), Some("a,b"));
        }

        #[test]
        fn test_size_cap_enforced() {
            let body = vec![b'x'; 32];
            assert!(inline_copy(&types(&["txt"]), 32, Some("txt"), &body).is_some());
            assert_eq!(inline_copy(&types(&["txt"]), 31, Some("txt"), &body), None);
        }

        #[test]
        fn test_non_utf8_payload_not_inlined() {
            assert_eq!(
                inline_copy(&types(&["txt"]), 1024, Some("txt"), &[0xff, 0xfe, 0x00]),
                None
            );
        }
    }

    mod in_flight_guard_tests {
        use super::*;

        fn node(id: &str) -> NodeId {
            id.parse().unwrap()
        }

        #[test]
        fn test_second_acquire_rejected_until_drop() {
            let map = Arc::new(DashMap::new());

            let guard = InFlightGuard::try_acquire(&map, node("n1"));
            assert!(guard.is_some());
            assert!(InFlightGuard::try_acquire(&map, node("n1")).is_none());

            // A different node is unaffected
            assert!(InFlightGuard::try_acquire(&map, node("n2")).is_some());

            drop(guard);
            assert!(InFlightGuard::try_acquire(&map, node("n1")).is_some());
        }
    }
}
