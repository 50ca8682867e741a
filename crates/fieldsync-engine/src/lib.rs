//! FieldSync Engine - Offline-first sync orchestration
//!
//! This crate drives the sync pipeline between the remote inspection API
//! and the local stores, entirely through the port traits defined in
//! `fieldsync-core`:
//!
//! - **differ** - Content hashing and snapshot classification
//! - **tree** - Lenient digital-asset-tree parsing
//! - **reconciler** - Hash-guarded catalog reconciliation with soft deletes
//! - **downloads** - Bounded-concurrency asset download manager
//! - **orchestrator** - Phased sync pass, progress reporting, cancellation
//!
//! # Sync Flow
//!
//! A full sync runs as an ordered sequence of phases:
//!
//! 1. **Ping** - Connectivity probe. Failure aborts the whole pass before
//!    any entity phase runs.
//! 2. **Projects / Defects / Events** - Each snapshot is fetched in full
//!    and reconciled against the stored catalog. A failing phase is
//!    recorded in the run report and the pass moves on.
//! 3. **Assets** - Asset trees are re-parsed, records refreshed, and every
//!    pending asset is downloaded with bounded concurrency.
//!
//! Failure isolation is per row and per asset: one bad record never stops
//! its batch, and nothing in this crate retries automatically. Re-queuing
//! failed work is the caller's explicit decision.

pub mod differ;
pub mod downloads;
pub mod orchestrator;
pub mod reconciler;
pub mod tree;

pub use differ::{content_hash, DigestIndex, Disposition};
pub use downloads::{DownloadManager, DownloadStats};
pub use orchestrator::{CleanupReport, OpKind, StatusSnapshot, SyncOrchestrator};
pub use reconciler::EntityReconciler;

use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// An exclusive operation was invoked while a previous invocation of
    /// the same kind was still running
    #[error("Operation already in flight: {0}")]
    OperationInFlight(OpKind),
}
