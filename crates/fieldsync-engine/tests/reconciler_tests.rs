//! Integration tests for EntityReconciler
//!
//! Each test runs reconcile passes against a fresh in-memory SQLite
//! store, checking the hash-guard semantics end to end: insert, skip,
//! update-in-place, soft delete, revival, and per-row failure isolation.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use fieldsync_core::domain::{
    ContentHash, Defect, EntityUid, InspectionEvent, LocalKey, Project, Stored,
};
use fieldsync_core::ports::{CatalogCounts, ICatalogStore, PurgedCatalog};
use fieldsync_engine::reconciler::EntityReconciler;
use fieldsync_store::{DatabasePool, SqliteStore};

// ============================================================================
// Test helpers
// ============================================================================

async fn setup() -> (Arc<SqliteStore>, EntityReconciler) {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let store = Arc::new(SqliteStore::new(pool.pool().clone()));
    let reconciler = EntityReconciler::new(store.clone() as Arc<dyn ICatalogStore>);
    (store, reconciler)
}

fn uid(s: &str) -> EntityUid {
    s.parse().unwrap()
}

fn project(uid_str: &str, name: &str) -> Project {
    Project::new(uid(uid_str), name.to_string()).unwrap()
}

fn defect(uid_str: &str, project_uid: &str, title: &str) -> Defect {
    Defect::new(uid(uid_str), uid(project_uid), title.to_string()).unwrap()
}

fn event(uid_str: &str, defect_uid: &str, description: &str) -> InspectionEvent {
    InspectionEvent::new(uid(uid_str), uid(defect_uid), description.to_string()).unwrap()
}

async fn stored_project(store: &SqliteStore, uid_str: &str) -> Stored<Project> {
    store
        .get_project(&uid(uid_str))
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("project {uid_str} not found"))
}

// ============================================================================
// Project pass
// ============================================================================

#[tokio::test]
async fn test_initial_snapshot_inserts_all_rows() {
    let (store, reconciler) = setup().await;

    let stats = reconciler
        .reconcile_projects(vec![
            project("p1", "Harbour Bridge"),
            project("p2", "River Tunnel"),
        ])
        .await
        .unwrap();

    assert_eq!(stats.checked, 2);
    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.soft_deleted, 0);

    assert!(store.get_project(&uid("p1")).await.unwrap().is_some());
    assert!(store.get_project(&uid("p2")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rerun_with_same_snapshot_is_noop() {
    let (_store, reconciler) = setup().await;
    let snapshot = || vec![project("p1", "Harbour Bridge"), project("p2", "River Tunnel")];

    reconciler.reconcile_projects(snapshot()).await.unwrap();
    let second = reconciler.reconcile_projects(snapshot()).await.unwrap();

    assert_eq!(second.checked, 2);
    assert_eq!(second.skipped, 2);
    assert!(second.is_noop(), "second pass must write nothing");
}

#[tokio::test]
async fn test_changed_row_updated_in_place_with_stable_key() {
    let (store, reconciler) = setup().await;

    reconciler
        .reconcile_projects(vec![project("p1", "Harbour Bridge")])
        .await
        .unwrap();
    let original = stored_project(&store, "p1").await;

    // Same content again: nothing written
    let unchanged = reconciler
        .reconcile_projects(vec![project("p1", "Harbour Bridge")])
        .await
        .unwrap();
    assert_eq!(unchanged.updated, 0);
    assert_eq!(unchanged.skipped, 1);

    // Every remote field changes; the surrogate key must not
    let renamed = project("p1", "Harbour Bridge (East)")
        .with_reference(Some("REF-7".to_string()))
        .with_status(Some("active".to_string()));
    let changed = reconciler.reconcile_projects(vec![renamed]).await.unwrap();
    assert_eq!(changed.updated, 1);
    assert_eq!(changed.inserted, 0);

    let after = stored_project(&store, "p1").await;
    assert_eq!(after.key(), original.key());
    assert_eq!(after.record().name(), "Harbour Bridge (East)");
    assert_ne!(after.content_hash(), original.content_hash());
}

#[tokio::test]
async fn test_mixed_batch_counters() {
    let (_store, reconciler) = setup().await;

    reconciler
        .reconcile_projects(vec![project("p1", "Bridge"), project("p2", "Tunnel")])
        .await
        .unwrap();

    // p1 unchanged, p2 changed, p3 new
    let stats = reconciler
        .reconcile_projects(vec![
            project("p1", "Bridge"),
            project("p2", "Tunnel South"),
            project("p3", "Culvert"),
        ])
        .await
        .unwrap();

    assert_eq!(stats.checked, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.soft_deleted, 0);
}

#[tokio::test]
async fn test_absent_rows_soft_deleted_then_revived_with_same_key() {
    let (store, reconciler) = setup().await;

    reconciler
        .reconcile_projects(vec![project("p1", "Bridge"), project("p2", "Tunnel")])
        .await
        .unwrap();
    let p2_before = stored_project(&store, "p2").await;

    // p2 drops out of the snapshot
    let shrunk = reconciler
        .reconcile_projects(vec![project("p1", "Bridge")])
        .await
        .unwrap();
    assert_eq!(shrunk.soft_deleted, 1);

    let p2_gone = stored_project(&store, "p2").await;
    assert!(p2_gone.is_deleted());

    // p2 reappears: the digest index covers live rows only, so it counts
    // as an insert, and the upsert revives the old row
    let revived = reconciler
        .reconcile_projects(vec![project("p1", "Bridge"), project("p2", "Tunnel")])
        .await
        .unwrap();
    assert_eq!(revived.inserted, 1);
    assert_eq!(revived.skipped, 1);

    let p2_after = stored_project(&store, "p2").await;
    assert!(!p2_after.is_deleted());
    assert_eq!(p2_after.key(), p2_before.key());
}

#[tokio::test]
async fn test_empty_snapshot_soft_deletes_everything() {
    let (store, reconciler) = setup().await;

    reconciler
        .reconcile_projects(vec![project("p1", "Bridge"), project("p2", "Tunnel")])
        .await
        .unwrap();

    let stats = reconciler.reconcile_projects(Vec::new()).await.unwrap();
    assert_eq!(stats.checked, 0);
    assert_eq!(stats.soft_deleted, 2);

    let counts = store.catalog_counts().await.unwrap();
    assert_eq!(counts.projects, 0, "live count excludes soft-deleted rows");
    assert!(stored_project(&store, "p1").await.is_deleted());
}

// ============================================================================
// Defect and event passes
// ============================================================================

#[tokio::test]
async fn test_defect_pass_mirrors_project_semantics() {
    let (store, reconciler) = setup().await;

    reconciler
        .reconcile_projects(vec![project("p1", "Bridge")])
        .await
        .unwrap();

    let first = reconciler
        .reconcile_defects(vec![
            defect("d1", "p1", "Cracked weld"),
            defect("d2", "p1", "Corroded bolt"),
        ])
        .await
        .unwrap();
    assert_eq!(first.inserted, 2);

    let second = reconciler
        .reconcile_defects(vec![
            defect("d1", "p1", "Cracked weld"),
            defect("d2", "p1", "Corroded bolt group 4"),
        ])
        .await
        .unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.updated, 1);

    let listed = store.list_defects_for_project(&uid("p1")).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_event_pass_soft_deletes_absentees() {
    let (store, reconciler) = setup().await;

    reconciler
        .reconcile_events(vec![
            event("e1", "d1", "First inspection"),
            event("e2", "d1", "Repair verified"),
        ])
        .await
        .unwrap();

    let stats = reconciler
        .reconcile_events(vec![event("e1", "d1", "First inspection")])
        .await
        .unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.soft_deleted, 1);

    let live = store.list_events_for_defect(&uid("d1")).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].record().uid().as_str(), "e1");
}

// ============================================================================
// Per-row failure isolation
// ============================================================================

/// Catalog store wrapper whose project upserts fail for one chosen UID
struct FailingCatalog {
    inner: Arc<SqliteStore>,
    fail_uid: EntityUid,
}

#[async_trait::async_trait]
impl ICatalogStore for FailingCatalog {
    async fn upsert_project(
        &self,
        project: &Project,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        if project.uid() == &self.fail_uid {
            bail!("simulated write failure");
        }
        self.inner.upsert_project(project, hash).await
    }

    async fn get_project(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Project>>> {
        self.inner.get_project(uid).await
    }

    async fn list_projects(&self, include_deleted: bool) -> anyhow::Result<Vec<Stored<Project>>> {
        self.inner.list_projects(include_deleted).await
    }

    async fn project_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.inner.project_digests().await
    }

    async fn soft_delete_projects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.inner.soft_delete_projects_absent(present).await
    }

    async fn upsert_defect(
        &self,
        defect: &Defect,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        self.inner.upsert_defect(defect, hash).await
    }

    async fn get_defect(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Defect>>> {
        self.inner.get_defect(uid).await
    }

    async fn list_defects_for_project(
        &self,
        project_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<Defect>>> {
        self.inner.list_defects_for_project(project_uid).await
    }

    async fn defect_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.inner.defect_digests().await
    }

    async fn soft_delete_defects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.inner.soft_delete_defects_absent(present).await
    }

    async fn upsert_event(
        &self,
        event: &InspectionEvent,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        self.inner.upsert_event(event, hash).await
    }

    async fn get_event(
        &self,
        uid: &EntityUid,
    ) -> anyhow::Result<Option<Stored<InspectionEvent>>> {
        self.inner.get_event(uid).await
    }

    async fn list_events_for_defect(
        &self,
        defect_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<InspectionEvent>>> {
        self.inner.list_events_for_defect(defect_uid).await
    }

    async fn event_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.inner.event_digests().await
    }

    async fn soft_delete_events_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.inner.soft_delete_events_absent(present).await
    }

    async fn catalog_counts(&self) -> anyhow::Result<CatalogCounts> {
        self.inner.catalog_counts().await
    }

    async fn purge_project(&self, uid: &EntityUid) -> anyhow::Result<PurgedCatalog> {
        self.inner.purge_project(uid).await
    }
}

#[tokio::test]
async fn test_failed_row_is_isolated_and_not_soft_deleted() {
    let pool = DatabasePool::in_memory().await.unwrap();
    let store = Arc::new(SqliteStore::new(pool.pool().clone()));

    // Seed p1 through the real store so the failing update has a target
    let seeded = EntityReconciler::new(store.clone() as Arc<dyn ICatalogStore>);
    seeded
        .reconcile_projects(vec![project("p1", "Bridge")])
        .await
        .unwrap();

    let failing = Arc::new(FailingCatalog {
        inner: store.clone(),
        fail_uid: uid("p1"),
    });
    let reconciler = EntityReconciler::new(failing as Arc<dyn ICatalogStore>);

    // p1's update fails, p2's insert succeeds, the batch finishes
    let stats = reconciler
        .reconcile_projects(vec![project("p1", "Bridge Renamed"), project("p2", "Tunnel")])
        .await
        .unwrap();

    assert_eq!(stats.checked, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.updated, 0);
    // The failed row was still in the snapshot, so it must not be
    // soft-deleted as a side effect
    assert_eq!(stats.soft_deleted, 0);

    let p1 = stored_project(&store, "p1").await;
    assert!(!p1.is_deleted());
    assert_eq!(p1.record().name(), "Bridge", "failed update leaves the old payload");
    assert!(store.get_project(&uid("p2")).await.unwrap().is_some());
}
