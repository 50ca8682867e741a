//! Hash-guarded catalog reconciliation
//!
//! Each pass takes one entity class's full remote snapshot and merges it
//! into the local catalog:
//!
//! 1. Build a [`DigestIndex`] over the stored live-row digests.
//! 2. Per record: skip when the hash matches, otherwise upsert. Upserts
//!    key on the external UID and never reassign the local surrogate key.
//! 3. After the batch, soft-delete live rows absent from the snapshot.
//!
//! Failure isolation is per row: a failed write increments a counter and
//! the batch continues. Dependent rows of a soft-deleted entity are left
//! intact; only the explicit cleanup path hard-deletes anything.

use std::sync::Arc;

use anyhow::{Context, Result};
use fieldsync_core::domain::progress::ReconcileStats;
use fieldsync_core::domain::{Defect, InspectionEvent, Project};
use fieldsync_core::ports::ICatalogStore;
use tracing::{debug, info, warn};

use crate::differ::{self, DigestIndex, Disposition};

/// Merges remote entity snapshots into the local catalog
pub struct EntityReconciler {
    catalog: Arc<dyn ICatalogStore>,
}

impl EntityReconciler {
    /// Creates a reconciler over the given catalog store
    pub fn new(catalog: Arc<dyn ICatalogStore>) -> Self {
        Self { catalog }
    }

    /// Reconciles the full project snapshot
    #[tracing::instrument(skip(self, snapshot), fields(count = snapshot.len()))]
    pub async fn reconcile_projects(&self, snapshot: Vec<Project>) -> Result<ReconcileStats> {
        let index = DigestIndex::new(
            self.catalog
                .project_digests()
                .await
                .context("Failed to load stored project digests")?,
        );

        let mut stats = ReconcileStats::new();
        // `present` carries every snapshot UID, including rows whose write
        // fails below; a failed update must not soft-delete its row too
        let mut present = Vec::with_capacity(snapshot.len());

        for record in snapshot {
            stats.checked += 1;
            let hash = differ::content_hash(&record);
            present.push(record.uid().clone());

            let disposition = index.classify(record.uid(), &hash);
            if disposition == Disposition::Unchanged {
                stats.skipped += 1;
                continue;
            }

            match self.catalog.upsert_project(&record, &hash).await {
                Ok(key) => {
                    tally_write(&mut stats, disposition);
                    debug!(uid = %record.uid(), key = %key, "Project row written");
                }
                Err(err) => {
                    stats.failed += 1;
                    warn!(uid = %record.uid(), error = %err, "Project write failed, batch continues");
                }
            }
        }

        stats.soft_deleted = self
            .catalog
            .soft_delete_projects_absent(&present)
            .await
            .context("Failed to soft-delete absent projects")?;

        log_pass("projects", &stats);
        Ok(stats)
    }

    /// Reconciles the full defect snapshot
    #[tracing::instrument(skip(self, snapshot), fields(count = snapshot.len()))]
    pub async fn reconcile_defects(&self, snapshot: Vec<Defect>) -> Result<ReconcileStats> {
        let index = DigestIndex::new(
            self.catalog
                .defect_digests()
                .await
                .context("Failed to load stored defect digests")?,
        );

        let mut stats = ReconcileStats::new();
        let mut present = Vec::with_capacity(snapshot.len());

        for record in snapshot {
            stats.checked += 1;
            let hash = differ::content_hash(&record);
            present.push(record.uid().clone());

            let disposition = index.classify(record.uid(), &hash);
            if disposition == Disposition::Unchanged {
                stats.skipped += 1;
                continue;
            }

            match self.catalog.upsert_defect(&record, &hash).await {
                Ok(key) => {
                    tally_write(&mut stats, disposition);
                    debug!(uid = %record.uid(), key = %key, "Defect row written");
                }
                Err(err) => {
                    stats.failed += 1;
                    warn!(uid = %record.uid(), error = %err, "Defect write failed, batch continues");
                }
            }
        }

        stats.soft_deleted = self
            .catalog
            .soft_delete_defects_absent(&present)
            .await
            .context("Failed to soft-delete absent defects")?;

        log_pass("defects", &stats);
        Ok(stats)
    }

    /// Reconciles the full inspection event snapshot
    #[tracing::instrument(skip(self, snapshot), fields(count = snapshot.len()))]
    pub async fn reconcile_events(&self, snapshot: Vec<InspectionEvent>) -> Result<ReconcileStats> {
        let index = DigestIndex::new(
            self.catalog
                .event_digests()
                .await
                .context("Failed to load stored event digests")?,
        );

        let mut stats = ReconcileStats::new();
        let mut present = Vec::with_capacity(snapshot.len());

        for record in snapshot {
            stats.checked += 1;
            let hash = differ::content_hash(&record);
            present.push(record.uid().clone());

            let disposition = index.classify(record.uid(), &hash);
            if disposition == Disposition::Unchanged {
                stats.skipped += 1;
                continue;
            }

            match self.catalog.upsert_event(&record, &hash).await {
                Ok(key) => {
                    tally_write(&mut stats, disposition);
                    debug!(uid = %record.uid(), key = %key, "Event row written");
                }
                Err(err) => {
                    stats.failed += 1;
                    warn!(uid = %record.uid(), error = %err, "Event write failed, batch continues");
                }
            }
        }

        stats.soft_deleted = self
            .catalog
            .soft_delete_events_absent(&present)
            .await
            .context("Failed to soft-delete absent events")?;

        log_pass("events", &stats);
        Ok(stats)
    }
}

/// Books a successful write under the right counter
fn tally_write(stats: &mut ReconcileStats, disposition: Disposition) {
    match disposition {
        Disposition::New => stats.inserted += 1,
        Disposition::Changed => stats.updated += 1,
        // Unchanged rows never reach the write path
        Disposition::Unchanged => {}
    }
}

fn log_pass(entity: &str, stats: &ReconcileStats) {
    info!(
        entity,
        checked = stats.checked,
        inserted = stats.inserted,
        updated = stats.updated,
        skipped = stats.skipped,
        soft_deleted = stats.soft_deleted,
        failed = stats.failed,
        "Reconcile pass finished"
    );
}
