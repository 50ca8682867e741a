//! Domain entities and business logic
//!
//! This module contains the core domain types for FieldSync:
//! - Newtypes for type-safe identifiers and validated domain types
//! - Catalog record types (projects, defects, inspection events)
//! - Digital asset types and the download state machine
//! - Sync progress and run reporting types
//! - Domain-specific error types

pub mod asset;
pub mod defect;
pub mod errors;
pub mod event;
pub mod newtypes;
pub mod progress;
pub mod project;
pub mod record;

// Re-export commonly used types
pub use asset::{AssetLeaf, AssetRecord, DownloadStatus};
pub use defect::Defect;
pub use errors::DomainError;
pub use event::InspectionEvent;
pub use newtypes::*;
pub use progress::{
    PhaseError, ReconcileStats, SyncOutcome, SyncPhase, SyncProgress, SyncReport,
};
pub use project::Project;
pub use record::{CatalogRecord, Stored};
