//! Catalog store port (driven/secondary port)
//!
//! This module defines the interface for persisting and querying the local
//! catalog: projects, defects, and inspection events mirrored from the
//! remote API.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem, etc.) and don't need domain-level classification.
//! - Upserts key on the external UID and return the local surrogate key.
//!   The surrogate key is assigned once at insert and is never reassigned
//!   by any later write; rows referencing it stay valid across syncs.
//! - Row deletion during sync is always a soft delete (a flag flip), so a
//!   record reappearing remotely resumes its old surrogate key. Hard
//!   deletion happens only through the explicit purge operation.

use std::collections::HashMap;

use crate::domain::{
    newtypes::{ContentHash, EntityUid, LocalKey},
    record::Stored,
    Defect, InspectionEvent, Project,
};

// ============================================================================
// CatalogCounts struct
// ============================================================================

/// Live (non-deleted) row counts per entity class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    /// Live project rows
    pub projects: u64,
    /// Live defect rows
    pub defects: u64,
    /// Live inspection event rows
    pub events: u64,
}

// ============================================================================
// PurgedCatalog struct
// ============================================================================

/// Rows removed by a destructive project purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgedCatalog {
    /// Project rows hard-deleted
    pub projects: u64,
    /// Defect rows hard-deleted
    pub defects: u64,
    /// Inspection event rows hard-deleted
    pub events: u64,
}

impl PurgedCatalog {
    /// Returns the total rows removed
    pub fn total(&self) -> u64 {
        self.projects + self.defects + self.events
    }
}

// ============================================================================
// ICatalogStore trait
// ============================================================================

/// Port trait for the persisted entity catalog
///
/// One method group per entity class, mirroring the reconcile pipeline.
/// All classes share the same shape: upsert by UID, digest listing for
/// cheap change detection, and soft deletion of absentees.
///
/// ## Implementation Notes
///
/// - `upsert_*` must write the record and its content hash in a single
///   transaction and must leave the surrogate key of an existing row
///   untouched.
/// - `*_digests` list live rows only. A soft-deleted row is invisible to
///   the differ, so a resurrected record is treated as new and the upsert
///   clears its deleted flag (keeping the old key).
/// - `soft_delete_*_absent` flags live rows whose UID is not in the given
///   present set and returns how many rows were flagged.
#[async_trait::async_trait]
pub trait ICatalogStore: Send + Sync {
    // --- Project operations ---

    /// Inserts or updates a project by UID, returning its surrogate key
    async fn upsert_project(
        &self,
        project: &Project,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey>;

    /// Retrieves a project by UID (including soft-deleted rows)
    async fn get_project(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Project>>>;

    /// Lists projects, optionally including soft-deleted rows
    async fn list_projects(&self, include_deleted: bool) -> anyhow::Result<Vec<Stored<Project>>>;

    /// Maps live project UIDs to their stored content hashes
    async fn project_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>>;

    /// Soft-deletes live projects absent from the given UID set
    async fn soft_delete_projects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64>;

    // --- Defect operations ---

    /// Inserts or updates a defect by UID, returning its surrogate key
    async fn upsert_defect(&self, defect: &Defect, hash: &ContentHash)
        -> anyhow::Result<LocalKey>;

    /// Retrieves a defect by UID (including soft-deleted rows)
    async fn get_defect(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Defect>>>;

    /// Lists live defects belonging to a project
    async fn list_defects_for_project(
        &self,
        project_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<Defect>>>;

    /// Maps live defect UIDs to their stored content hashes
    async fn defect_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>>;

    /// Soft-deletes live defects absent from the given UID set
    async fn soft_delete_defects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64>;

    // --- Inspection event operations ---

    /// Inserts or updates an inspection event by UID, returning its surrogate key
    async fn upsert_event(
        &self,
        event: &InspectionEvent,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey>;

    /// Retrieves an inspection event by UID (including soft-deleted rows)
    async fn get_event(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<InspectionEvent>>>;

    /// Lists live inspection events belonging to a defect
    async fn list_events_for_defect(
        &self,
        defect_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<InspectionEvent>>>;

    /// Maps live inspection event UIDs to their stored content hashes
    async fn event_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>>;

    /// Soft-deletes live inspection events absent from the given UID set
    async fn soft_delete_events_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64>;

    // --- Cross-class operations ---

    /// Counts live rows per entity class
    async fn catalog_counts(&self) -> anyhow::Result<CatalogCounts>;

    /// Hard-deletes a project and its dependent defects and events
    ///
    /// This is the only destructive catalog operation; sync never calls it.
    async fn purge_project(&self, uid: &EntityUid) -> anyhow::Result<PurgedCatalog>;
}
