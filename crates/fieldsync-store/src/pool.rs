//! Database connection pool management
//!
//! Provides a connection pool for SQLite with automatic schema migration.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::StoreError;

/// A managed SQLite connection pool.
///
/// Handles connection lifecycle, WAL journaling, and schema migrations.
/// Cloning is cheap; the underlying pool is shared.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (or creates) the database at `db_path` and runs migrations.
    ///
    /// The parent directory is created if it does not exist. The database
    /// uses WAL journaling so sync writes do not block cached reads.
    ///
    /// # Arguments
    /// * `db_path` - Filesystem path to the SQLite database file
    ///
    /// # Errors
    /// Returns `StoreError::ConnectionFailed` if the pool cannot be
    /// established, or `StoreError::MigrationFailed` if the schema cannot
    /// be applied.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(path = %db_path.display(), "Database pool established");

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Opens an in-memory database for tests.
    ///
    /// Uses a single connection so the database survives for the lifetime
    /// of the pool, and enables foreign key enforcement which SQLite
    /// leaves off by default.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Applies the schema migration script.
    ///
    /// The script is idempotent (`CREATE TABLE IF NOT EXISTS`), so running
    /// it on an already-migrated database is a no-op.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        let migration = include_str!("migrations/20260510_initial.sql");

        sqlx::raw_sql(migration)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        debug!("Database migrations applied");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_creates_schema() {
        let db = DatabasePool::in_memory().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"projects"));
        assert!(names.contains(&"defects"));
        assert!(names.contains(&"events"));
        assert!(names.contains(&"assets"));
        assert!(names.contains(&"asset_owners"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = DatabasePool::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("deep").join("test.db");

        let db = DatabasePool::new(&db_path).await.unwrap();
        assert!(db_path.exists());

        drop(db);
    }
}
