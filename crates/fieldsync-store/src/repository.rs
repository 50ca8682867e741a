//! SQLite implementation of ICatalogStore and IAssetStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! catalog and asset store ports defined in fieldsync-core. It handles all
//! domain type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type            | SQL Type | Strategy                          |
//! |------------------------|----------|-----------------------------------|
//! | EntityUid              | TEXT     | String via `.as_str()` / `EntityUid::new()` |
//! | NodeId, FileId         | TEXT     | String via `.as_str()` / constructors |
//! | LocalKey               | INTEGER  | AUTOINCREMENT rowid via `LocalKey::new()` |
//! | ContentHash            | TEXT     | 64-char hex via `.as_str()` / `ContentHash::new()` |
//! | DownloadStatus         | TEXT     | Stable name via `.name()` / `DownloadStatus::parse()` |
//! | DateTime<Utc>          | TEXT     | ISO 8601 via `to_rfc3339()` / `DateTime::parse_from_rfc3339()` |
//! | bool (deleted flag)    | INTEGER  | 0 / 1                             |
//! | PathBuf (local_path)   | TEXT     | Lossy UTF-8 string                |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use fieldsync_core::domain::{
    asset::{AssetLeaf, AssetRecord, DownloadStatus},
    newtypes::{ContentHash, EntityUid, FileId, LocalKey, NodeId},
    record::Stored,
    Defect, InspectionEvent, Project,
};
use fieldsync_core::ports::{
    AssetCounts, CatalogCounts, IAssetStore, ICatalogStore, PurgedAssets, PurgedCatalog,
};

use crate::StoreError;

/// SQLite-based implementation of the catalog and asset store ports
///
/// Provides persistent storage for the mirrored entity catalog and asset
/// download state. All operations go through a connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads the uid -> content hash map of live rows in a catalog table.
    ///
    /// `table` is always one of the fixed catalog table names, never
    /// external input.
    async fn digests_for(&self, table: &str) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        let sql = format!("SELECT uid, content_hash FROM {table} WHERE deleted = 0");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut digests = HashMap::with_capacity(rows.len());
        for row in &rows {
            let uid_str: String = row.get("uid");
            let hash_str: String = row.get("content_hash");

            let uid = EntityUid::new(uid_str.clone()).map_err(|e| {
                StoreError::SerializationError(format!("Invalid EntityUid '{uid_str}': {e}"))
            })?;
            let hash = ContentHash::new(hash_str.clone()).map_err(|e| {
                StoreError::SerializationError(format!("Invalid ContentHash '{hash_str}': {e}"))
            })?;

            digests.insert(uid, hash);
        }
        Ok(digests)
    }

    /// Soft-deletes live rows of a catalog table whose uid is not in
    /// `present`, returning how many rows were flagged.
    ///
    /// An empty present set flags every live row: the remote snapshot is
    /// authoritative, and an empty snapshot means everything is gone.
    async fn soft_delete_absent_in(
        &self,
        table: &str,
        present: &[EntityUid],
    ) -> anyhow::Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = if present.is_empty() {
            let sql = format!("UPDATE {table} SET deleted = 1, updated_at = ? WHERE deleted = 0");
            sqlx::query(&sql).bind(&now).execute(&self.pool).await?
        } else {
            let sql = format!(
                "UPDATE {table} SET deleted = 1, updated_at = ? \
                 WHERE deleted = 0 AND uid NOT IN ({})",
                placeholders(present.len())
            );
            let mut query = sqlx::query(&sql).bind(&now);
            for uid in present {
                query = query.bind(uid.as_str());
            }
            query.execute(&self.pool).await?
        };

        let flagged = result.rows_affected();
        if flagged > 0 {
            tracing::debug!(table, count = flagged, "Soft-deleted absent rows");
        }
        Ok(flagged)
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Builds a comma-separated "?" placeholder list for IN clauses
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Parse a DateTime<Utc> from a stored string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing without timezone (SQLite default format)
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{s}': {e}"))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Shared sync bookkeeping columns common to all catalog tables
fn bookkeeping_from_row(
    row: &SqliteRow,
) -> Result<(LocalKey, ContentHash, bool, DateTime<Utc>, DateTime<Utc>), StoreError> {
    let id: i64 = row.get("id");
    let hash_str: String = row.get("content_hash");
    let deleted: i64 = row.get("deleted");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    let hash = ContentHash::new(hash_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid ContentHash '{hash_str}': {e}"))
    })?;
    let created_at = parse_datetime(&created_at_str)?;
    let updated_at = parse_datetime(&updated_at_str)?;

    Ok((LocalKey::new(id), hash, deleted != 0, created_at, updated_at))
}

/// Reconstruct a stored Project from a database row
fn stored_project_from_row(row: &SqliteRow) -> Result<Stored<Project>, StoreError> {
    let uid_str: String = row.get("uid");
    let name: String = row.get("name");
    let reference: Option<String> = row.get("reference");
    let address: Option<String> = row.get("address");
    let status: Option<String> = row.get("status");
    let remote_updated_at_str: Option<String> = row.get("remote_updated_at");

    let uid = EntityUid::new(uid_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityUid '{uid_str}': {e}"))
    })?;

    let project = Project::new(uid, name)
        .map_err(|e| StoreError::SerializationError(format!("Invalid project row: {e}")))?
        .with_reference(reference)
        .with_address(address)
        .with_status(status)
        .with_remote_updated_at(parse_optional_datetime(remote_updated_at_str)?);

    let (key, hash, deleted, created_at, updated_at) = bookkeeping_from_row(row)?;
    Ok(Stored::new(key, project, hash, deleted, created_at, updated_at))
}

/// Reconstruct a stored Defect from a database row
fn stored_defect_from_row(row: &SqliteRow) -> Result<Stored<Defect>, StoreError> {
    let uid_str: String = row.get("uid");
    let project_uid_str: String = row.get("project_uid");
    let title: String = row.get("title");
    let severity: Option<String> = row.get("severity");
    let status: Option<String> = row.get("status");
    let remote_updated_at_str: Option<String> = row.get("remote_updated_at");

    let uid = EntityUid::new(uid_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityUid '{uid_str}': {e}"))
    })?;
    let project_uid = EntityUid::new(project_uid_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityUid '{project_uid_str}': {e}"))
    })?;

    let defect = Defect::new(uid, project_uid, title)
        .map_err(|e| StoreError::SerializationError(format!("Invalid defect row: {e}")))?
        .with_severity(severity)
        .with_status(status)
        .with_remote_updated_at(parse_optional_datetime(remote_updated_at_str)?);

    let (key, hash, deleted, created_at, updated_at) = bookkeeping_from_row(row)?;
    Ok(Stored::new(key, defect, hash, deleted, created_at, updated_at))
}

/// Reconstruct a stored InspectionEvent from a database row
fn stored_event_from_row(row: &SqliteRow) -> Result<Stored<InspectionEvent>, StoreError> {
    let uid_str: String = row.get("uid");
    let defect_uid_str: String = row.get("defect_uid");
    let description: String = row.get("description");
    let event_type: Option<String> = row.get("event_type");
    let occurred_at_str: Option<String> = row.get("occurred_at");

    let uid = EntityUid::new(uid_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityUid '{uid_str}': {e}"))
    })?;
    let defect_uid = EntityUid::new(defect_uid_str.clone()).map_err(|e| {
        StoreError::SerializationError(format!("Invalid EntityUid '{defect_uid_str}': {e}"))
    })?;

    let event = InspectionEvent::new(uid, defect_uid, description)
        .map_err(|e| StoreError::SerializationError(format!("Invalid event row: {e}")))?
        .with_event_type(event_type)
        .with_occurred_at(parse_optional_datetime(occurred_at_str)?);

    let (key, hash, deleted, created_at, updated_at) = bookkeeping_from_row(row)?;
    Ok(Stored::new(key, event, hash, deleted, created_at, updated_at))
}

/// Reconstruct an AssetRecord from a database row
///
/// Uses serde JSON deserialization to reconstruct the record since the
/// struct has private fields that can only be set through `from_leaf` and
/// the state machine methods, neither of which can restore stored state.
fn asset_from_row(row: &SqliteRow) -> Result<AssetRecord, StoreError> {
    let node_id: String = row.get("node_id");
    let parent_id: Option<String> = row.get("parent_id");
    let file_id: String = row.get("file_id");
    let name: String = row.get("name");
    let node_type: String = row.get("node_type");
    let file_type: Option<String> = row.get("file_type");
    let file_size: Option<i64> = row.get("file_size");
    let status: String = row.get("status");
    let download_url: Option<String> = row.get("download_url");
    let local_path: Option<String> = row.get("local_path");
    let content: Option<String> = row.get("content");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    // Round the timestamps through the parser so naive SQLite strings come
    // back out in the RFC 3339 form chrono's serde expects
    let created_at = parse_datetime(&created_at_str)?;
    let updated_at = parse_datetime(&updated_at_str)?;

    let record_json = serde_json::json!({
        "node_id": node_id.as_str(),
        "parent_id": parent_id,
        "file_id": file_id,
        "name": name,
        "node_type": node_type,
        "file_type": file_type,
        "file_size": file_size,
        "status": status,
        "download_url": download_url,
        "local_path": local_path,
        "content": content,
        "created_at": created_at.to_rfc3339(),
        "updated_at": updated_at.to_rfc3339(),
    });

    serde_json::from_value(record_json).map_err(|e| {
        StoreError::SerializationError(format!(
            "Failed to reconstruct asset row '{node_id}': {e}"
        ))
    })
}

// ============================================================================
// ICatalogStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ICatalogStore for SqliteStore {
    // --- Project operations ---

    async fn upsert_project(
        &self,
        project: &Project,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        let now = Utc::now().to_rfc3339();

        // DO UPDATE (not INSERT OR REPLACE) so the existing rowid survives
        // the write; deleted = 0 resurrects a soft-deleted row under its
        // old key
        sqlx::query(
            "INSERT INTO projects \
             (uid, name, reference, address, status, remote_updated_at, \
              content_hash, deleted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?) \
             ON CONFLICT(uid) DO UPDATE SET \
                 name = excluded.name, \
                 reference = excluded.reference, \
                 address = excluded.address, \
                 status = excluded.status, \
                 remote_updated_at = excluded.remote_updated_at, \
                 content_hash = excluded.content_hash, \
                 deleted = 0, \
                 updated_at = excluded.updated_at",
        )
        .bind(project.uid().as_str())
        .bind(project.name())
        .bind(project.reference())
        .bind(project.address())
        .bind(project.status())
        .bind(project.remote_updated_at().map(|ts| ts.to_rfc3339()))
        .bind(hash.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM projects WHERE uid = ?")
            .bind(project.uid().as_str())
            .fetch_one(&self.pool)
            .await?;

        tracing::trace!(uid = %project.uid(), key = id, "Upserted project");
        Ok(LocalKey::new(id))
    }

    async fn get_project(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Project>>> {
        let row = sqlx::query("SELECT * FROM projects WHERE uid = ?")
            .bind(uid.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(stored_project_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_projects(&self, include_deleted: bool) -> anyhow::Result<Vec<Stored<Project>>> {
        let sql = if include_deleted {
            "SELECT * FROM projects ORDER BY name"
        } else {
            "SELECT * FROM projects WHERE deleted = 0 ORDER BY name"
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in &rows {
            projects.push(stored_project_from_row(row)?);
        }
        Ok(projects)
    }

    async fn project_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.digests_for("projects").await
    }

    async fn soft_delete_projects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.soft_delete_absent_in("projects", present).await
    }

    // --- Defect operations ---

    async fn upsert_defect(
        &self,
        defect: &Defect,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO defects \
             (uid, project_uid, title, severity, status, remote_updated_at, \
              content_hash, deleted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?) \
             ON CONFLICT(uid) DO UPDATE SET \
                 project_uid = excluded.project_uid, \
                 title = excluded.title, \
                 severity = excluded.severity, \
                 status = excluded.status, \
                 remote_updated_at = excluded.remote_updated_at, \
                 content_hash = excluded.content_hash, \
                 deleted = 0, \
                 updated_at = excluded.updated_at",
        )
        .bind(defect.uid().as_str())
        .bind(defect.project_uid().as_str())
        .bind(defect.title())
        .bind(defect.severity())
        .bind(defect.status())
        .bind(defect.remote_updated_at().map(|ts| ts.to_rfc3339()))
        .bind(hash.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM defects WHERE uid = ?")
            .bind(defect.uid().as_str())
            .fetch_one(&self.pool)
            .await?;

        tracing::trace!(uid = %defect.uid(), key = id, "Upserted defect");
        Ok(LocalKey::new(id))
    }

    async fn get_defect(&self, uid: &EntityUid) -> anyhow::Result<Option<Stored<Defect>>> {
        let row = sqlx::query("SELECT * FROM defects WHERE uid = ?")
            .bind(uid.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(stored_defect_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_defects_for_project(
        &self,
        project_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<Defect>>> {
        let rows = sqlx::query(
            "SELECT * FROM defects WHERE project_uid = ? AND deleted = 0 ORDER BY uid",
        )
        .bind(project_uid.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut defects = Vec::with_capacity(rows.len());
        for row in &rows {
            defects.push(stored_defect_from_row(row)?);
        }
        Ok(defects)
    }

    async fn defect_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.digests_for("defects").await
    }

    async fn soft_delete_defects_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.soft_delete_absent_in("defects", present).await
    }

    // --- Inspection event operations ---

    async fn upsert_event(
        &self,
        event: &InspectionEvent,
        hash: &ContentHash,
    ) -> anyhow::Result<LocalKey> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO events \
             (uid, defect_uid, description, event_type, occurred_at, \
              content_hash, deleted, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?) \
             ON CONFLICT(uid) DO UPDATE SET \
                 defect_uid = excluded.defect_uid, \
                 description = excluded.description, \
                 event_type = excluded.event_type, \
                 occurred_at = excluded.occurred_at, \
                 content_hash = excluded.content_hash, \
                 deleted = 0, \
                 updated_at = excluded.updated_at",
        )
        .bind(event.uid().as_str())
        .bind(event.defect_uid().as_str())
        .bind(event.description())
        .bind(event.event_type())
        .bind(event.occurred_at().map(|ts| ts.to_rfc3339()))
        .bind(hash.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM events WHERE uid = ?")
            .bind(event.uid().as_str())
            .fetch_one(&self.pool)
            .await?;

        tracing::trace!(uid = %event.uid(), key = id, "Upserted event");
        Ok(LocalKey::new(id))
    }

    async fn get_event(
        &self,
        uid: &EntityUid,
    ) -> anyhow::Result<Option<Stored<InspectionEvent>>> {
        let row = sqlx::query("SELECT * FROM events WHERE uid = ?")
            .bind(uid.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(stored_event_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_events_for_defect(
        &self,
        defect_uid: &EntityUid,
    ) -> anyhow::Result<Vec<Stored<InspectionEvent>>> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE defect_uid = ? AND deleted = 0 ORDER BY uid",
        )
        .bind(defect_uid.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(stored_event_from_row(row)?);
        }
        Ok(events)
    }

    async fn event_digests(&self) -> anyhow::Result<HashMap<EntityUid, ContentHash>> {
        self.digests_for("events").await
    }

    async fn soft_delete_events_absent(&self, present: &[EntityUid]) -> anyhow::Result<u64> {
        self.soft_delete_absent_in("events", present).await
    }

    // --- Cross-class operations ---

    async fn catalog_counts(&self) -> anyhow::Result<CatalogCounts> {
        let projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE deleted = 0")
            .fetch_one(&self.pool)
            .await?;
        let defects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM defects WHERE deleted = 0")
            .fetch_one(&self.pool)
            .await?;
        let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE deleted = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(CatalogCounts {
            projects: projects as u64,
            defects: defects as u64,
            events: events as u64,
        })
    }

    async fn purge_project(&self, uid: &EntityUid) -> anyhow::Result<PurgedCatalog> {
        let mut tx = self.pool.begin().await?;

        // Children first, FK order: events hang off defects, defects off
        // the project
        let events = sqlx::query(
            "DELETE FROM events WHERE defect_uid IN \
             (SELECT uid FROM defects WHERE project_uid = ?)",
        )
        .bind(uid.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let defects = sqlx::query("DELETE FROM defects WHERE project_uid = ?")
            .bind(uid.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let projects = sqlx::query("DELETE FROM projects WHERE uid = ?")
            .bind(uid.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        let purged = PurgedCatalog {
            projects,
            defects,
            events,
        };
        tracing::debug!(uid = %uid, removed = purged.total(), "Purged project catalog rows");
        Ok(purged)
    }
}

// ============================================================================
// IAssetStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IAssetStore for SqliteStore {
    // --- Record maintenance ---

    async fn upsert_asset(&self, leaf: &AssetLeaf) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        // Metadata refresh only: status, download_url, local_path, and
        // content are never listed in the DO UPDATE set, so re-parsing a
        // tree cannot disturb a download in any state
        sqlx::query(
            "INSERT INTO assets \
             (node_id, parent_id, file_id, name, node_type, file_type, file_size, \
              status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?) \
             ON CONFLICT(node_id) DO UPDATE SET \
                 parent_id = excluded.parent_id, \
                 file_id = excluded.file_id, \
                 name = excluded.name, \
                 node_type = excluded.node_type, \
                 file_type = excluded.file_type, \
                 file_size = excluded.file_size, \
                 updated_at = excluded.updated_at",
        )
        .bind(leaf.node_id.as_str())
        .bind(leaf.parent_id.as_ref().map(|p| p.as_str()))
        .bind(leaf.file_id.as_str())
        .bind(&leaf.name)
        .bind(&leaf.node_type)
        .bind(leaf.file_type.as_deref())
        .bind(leaf.file_size.map(|s| s as i64))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::trace!(node_id = %leaf.node_id, "Upserted asset record");
        Ok(())
    }

    async fn replace_owner_assets(
        &self,
        owner: &EntityUid,
        node_ids: &[NodeId],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM asset_owners WHERE project_uid = ?")
            .bind(owner.as_str())
            .execute(&mut *tx)
            .await?;

        for node_id in node_ids {
            sqlx::query("INSERT OR IGNORE INTO asset_owners (project_uid, node_id) VALUES (?, ?)")
                .bind(owner.as_str())
                .bind(node_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::trace!(owner = %owner, count = node_ids.len(), "Replaced owner asset links");
        Ok(())
    }

    // --- Queries ---

    async fn get_asset(&self, node_id: &NodeId) -> anyhow::Result<Option<AssetRecord>> {
        let row = sqlx::query("SELECT * FROM assets WHERE node_id = ?")
            .bind(node_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(asset_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn assets_with_status(
        &self,
        status: DownloadStatus,
    ) -> anyhow::Result<Vec<AssetRecord>> {
        let rows = sqlx::query("SELECT * FROM assets WHERE status = ? ORDER BY node_id")
            .bind(status.name())
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(asset_from_row(row)?);
        }
        Ok(records)
    }

    async fn assets_for_owner(&self, owner: &EntityUid) -> anyhow::Result<Vec<AssetRecord>> {
        let rows = sqlx::query(
            "SELECT a.* FROM assets a \
             JOIN asset_owners o ON o.node_id = a.node_id \
             WHERE o.project_uid = ? ORDER BY a.node_id",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(asset_from_row(row)?);
        }
        Ok(records)
    }

    async fn owners_of(&self, node_id: &NodeId) -> anyhow::Result<Vec<EntityUid>> {
        let rows = sqlx::query(
            "SELECT project_uid FROM asset_owners WHERE node_id = ? ORDER BY project_uid",
        )
        .bind(node_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut owners = Vec::with_capacity(rows.len());
        for row in &rows {
            let uid_str: String = row.get("project_uid");
            let uid = EntityUid::new(uid_str.clone()).map_err(|e| {
                StoreError::SerializationError(format!("Invalid EntityUid '{uid_str}': {e}"))
            })?;
            owners.push(uid);
        }
        Ok(owners)
    }

    async fn asset_counts(&self) -> anyhow::Result<AssetCounts> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM assets GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = AssetCounts::default();
        for row in &rows {
            let status_str: String = row.get("status");
            let n: i64 = row.get("n");

            let status = DownloadStatus::parse(&status_str).map_err(|e| {
                StoreError::SerializationError(format!("Bad status in assets table: {e}"))
            })?;
            match status {
                DownloadStatus::Pending => counts.pending = n as u64,
                DownloadStatus::Resolving => counts.resolving = n as u64,
                DownloadStatus::Downloading => counts.downloading = n as u64,
                DownloadStatus::Completed => counts.completed = n as u64,
                DownloadStatus::Failed => counts.failed = n as u64,
            }
        }
        Ok(counts)
    }

    async fn is_cached(&self, node_id: &NodeId) -> anyhow::Result<bool> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM assets WHERE node_id = ?")
                .bind(node_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(matches!(status.as_deref(), Some("completed")))
    }

    async fn url_for_file(&self, file_id: &FileId) -> anyhow::Result<Option<String>> {
        let url: Option<String> = sqlx::query_scalar(
            "SELECT download_url FROM assets \
             WHERE file_id = ? AND download_url IS NOT NULL LIMIT 1",
        )
        .bind(file_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(url)
    }

    // --- Download state writes ---

    async fn mark_resolving(&self, node_id: &NodeId) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE assets SET status = 'resolving', updated_at = ? WHERE node_id = ?",
        )
        .bind(&now)
        .bind(node_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Asset {node_id} not found");
        }

        tracing::trace!(node_id = %node_id, "Asset resolving");
        Ok(())
    }

    async fn mark_downloading(&self, node_id: &NodeId, url: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE assets SET status = 'downloading', download_url = ?, updated_at = ? \
             WHERE node_id = ?",
        )
        .bind(url)
        .bind(&now)
        .bind(node_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Asset {node_id} not found");
        }

        tracing::trace!(node_id = %node_id, "Asset downloading");
        Ok(())
    }

    async fn complete_asset(
        &self,
        node_id: &NodeId,
        local_path: &Path,
        content: Option<&str>,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let path_str = local_path.to_string_lossy().into_owned();

        // Status and payload land in one statement; no observer can see a
        // completed row without its path
        let result = sqlx::query(
            "UPDATE assets SET status = 'completed', local_path = ?, content = ?, \
             updated_at = ? WHERE node_id = ?",
        )
        .bind(&path_str)
        .bind(content)
        .bind(&now)
        .bind(node_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Asset {node_id} not found");
        }

        tracing::trace!(node_id = %node_id, path = %path_str, "Asset completed");
        Ok(())
    }

    async fn fail_asset(&self, node_id: &NodeId) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        // Payload columns untouched: a failed re-fetch keeps the previous
        // good copy
        let result = sqlx::query(
            "UPDATE assets SET status = 'failed', updated_at = ? WHERE node_id = ?",
        )
        .bind(&now)
        .bind(node_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Asset {node_id} not found");
        }

        tracing::trace!(node_id = %node_id, "Asset failed");
        Ok(())
    }

    // --- Explicit sweeps ---

    async fn reset_failed_assets(&self) -> anyhow::Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE assets SET status = 'pending', updated_at = ? WHERE status = 'failed'",
        )
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let requeued = result.rows_affected();
        if requeued > 0 {
            tracing::debug!(count = requeued, "Re-queued failed assets");
        }
        Ok(requeued)
    }

    async fn reset_asset(&self, node_id: &NodeId) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();

        // Payload is kept until the next completion overwrites it, so the
        // cached copy stays usable while the re-fetch runs
        let result = sqlx::query(
            "UPDATE assets SET status = 'pending', updated_at = ? \
             WHERE node_id = ? AND status = 'completed'",
        )
        .bind(&now)
        .bind(node_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Asset {node_id} not found or not completed");
        }

        tracing::debug!(node_id = %node_id, "Re-queued asset for re-fetch");
        Ok(())
    }

    async fn purge_owner_assets(&self, owner: &EntityUid) -> anyhow::Result<PurgedAssets> {
        let mut tx = self.pool.begin().await?;

        // Orphans-to-be: nodes owned by this project and by nobody else.
        // Collected before the links are dropped.
        let orphan_rows = sqlx::query(
            "SELECT a.node_id, a.local_path FROM assets a \
             JOIN asset_owners o ON o.node_id = a.node_id \
             WHERE o.project_uid = ? \
               AND NOT EXISTS (SELECT 1 FROM asset_owners o2 \
                               WHERE o2.node_id = a.node_id AND o2.project_uid <> ?)",
        )
        .bind(owner.as_str())
        .bind(owner.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let unlinked = sqlx::query("DELETE FROM asset_owners WHERE project_uid = ?")
            .bind(owner.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut deleted_assets = 0u64;
        let mut orphan_paths = Vec::new();
        for row in &orphan_rows {
            let node_id: String = row.get("node_id");
            let local_path: Option<String> = row.get("local_path");

            deleted_assets += sqlx::query("DELETE FROM assets WHERE node_id = ?")
                .bind(&node_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if let Some(path) = local_path {
                orphan_paths.push(PathBuf::from(path));
            }
        }

        tx.commit().await?;

        let purged = PurgedAssets {
            unlinked,
            deleted_assets,
            orphan_paths,
        };
        tracing::debug!(
            owner = %owner,
            unlinked = purged.unlinked,
            deleted = purged.deleted_assets,
            "Purged owner assets"
        );
        Ok(purged)
    }
}
