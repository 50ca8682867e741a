//! Sync run progress and reporting
//!
//! This module defines the phase pipeline a sync run walks through, the
//! ephemeral [`SyncProgress`] snapshots streamed to observers, and the
//! [`SyncReport`] summarizing a finished run. Progress values are UI
//! feedback only and are never persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RunId;

// ============================================================================
// SyncPhase
// ============================================================================

/// Phase of the sync pipeline
///
/// Entity phases are ordered: defects reference project rows and events
/// reference defect rows, so later phases depend on the surrogate keys the
/// earlier ones produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Run accepted, nothing started yet
    #[default]
    Init,
    /// Connectivity check against the remote API
    Ping,
    /// Reconciling projects
    SyncProjects,
    /// Reconciling defects
    SyncDefects,
    /// Reconciling inspection events
    SyncEvents,
    /// Parsing asset trees and downloading content
    SyncAssets,
    /// Run finished (successfully or not)
    Done,
}

impl SyncPhase {
    /// Returns the phase name as a stable snake_case string
    pub fn name(&self) -> &'static str {
        match self {
            SyncPhase::Init => "init",
            SyncPhase::Ping => "ping",
            SyncPhase::SyncProjects => "sync_projects",
            SyncPhase::SyncDefects => "sync_defects",
            SyncPhase::SyncEvents => "sync_events",
            SyncPhase::SyncAssets => "sync_assets",
            SyncPhase::Done => "done",
        }
    }

    /// Returns a human-readable label for progress display
    pub fn label(&self) -> &'static str {
        match self {
            SyncPhase::Init => "Preparing sync",
            SyncPhase::Ping => "Checking connectivity",
            SyncPhase::SyncProjects => "Syncing projects",
            SyncPhase::SyncDefects => "Syncing defects",
            SyncPhase::SyncEvents => "Syncing inspection events",
            SyncPhase::SyncAssets => "Downloading assets",
            SyncPhase::Done => "Finished",
        }
    }

    /// Returns the overall fraction reached when this phase begins
    ///
    /// The asset phase interpolates from its base towards `Done`; see
    /// [`SyncProgress::downloading`].
    pub fn base_fraction(&self) -> f64 {
        match self {
            SyncPhase::Init => 0.0,
            SyncPhase::Ping => 0.05,
            SyncPhase::SyncProjects => 0.15,
            SyncPhase::SyncDefects => 0.30,
            SyncPhase::SyncEvents => 0.45,
            SyncPhase::SyncAssets => 0.50,
            SyncPhase::Done => 1.0,
        }
    }

    /// Returns true if the run has finished
    pub fn is_done(&self) -> bool {
        matches!(self, SyncPhase::Done)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// SyncProgress
// ============================================================================

/// Fraction of the progress bar reserved for asset downloads.
///
/// Downloads interpolate from the asset phase's base fraction up to 0.95;
/// the final step to 1.0 belongs to `Done`.
const ASSET_SPAN: f64 = 0.45;

/// An ephemeral progress snapshot streamed to observers during a sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Current phase
    phase: SyncPhase,
    /// Human-readable message for display
    message: String,
    /// Overall completion in `0.0..=1.0`
    fraction: f64,
}

impl SyncProgress {
    /// Creates a progress snapshot, clamping the fraction into `0.0..=1.0`
    pub fn new(phase: SyncPhase, message: impl Into<String>, fraction: f64) -> Self {
        Self {
            phase,
            message: message.into(),
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Creates the snapshot emitted when a phase begins
    #[must_use]
    pub fn for_phase(phase: SyncPhase) -> Self {
        Self::new(phase, phase.label(), phase.base_fraction())
    }

    /// Creates a download-progress snapshot for `done` of `total` assets
    #[must_use]
    pub fn downloading(done: u64, total: u64) -> Self {
        let base = SyncPhase::SyncAssets.base_fraction();
        let fraction = if total == 0 {
            base
        } else {
            base + ASSET_SPAN * (done as f64 / total as f64)
        };
        Self::new(
            SyncPhase::SyncAssets,
            format!("Downloading assets ({done}/{total})"),
            fraction,
        )
    }

    /// Creates the terminal snapshot for an aborted run
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(SyncPhase::Done, message, 1.0)
    }

    // --- Getters ---

    /// Returns the current phase
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Returns the display message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the overall completion fraction
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Returns the completion as a percentage (0.0 to 100.0)
    pub fn percent(&self) -> f64 {
        self.fraction * 100.0
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::for_phase(SyncPhase::Init)
    }
}

impl fmt::Display for SyncProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3.0}%] {}", self.percent(), self.message)
    }
}

// ============================================================================
// ReconcileStats
// ============================================================================

/// Row-level counters from one reconcile pass over an entity class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Remote records examined
    pub checked: u64,
    /// New rows inserted
    pub inserted: u64,
    /// Existing rows rewritten in place
    pub updated: u64,
    /// Rows skipped because the content hash matched
    pub skipped: u64,
    /// Rows soft-deleted because the remote batch no longer contains them
    pub soft_deleted: u64,
    /// Rows whose write failed and was isolated
    pub failed: u64,
}

impl ReconcileStats {
    /// Creates zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows actually written
    pub fn writes(&self) -> u64 {
        self.inserted + self.updated + self.soft_deleted
    }

    /// Returns true if the pass changed nothing
    pub fn is_noop(&self) -> bool {
        self.writes() == 0
    }

    /// Folds another pass's counters into this one
    pub fn merge(&mut self, other: &ReconcileStats) {
        self.checked += other.checked;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.soft_deleted += other.soft_deleted;
        self.failed += other.failed;
    }
}

// ============================================================================
// SyncOutcome
// ============================================================================

/// Terminal outcome of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Run is still in progress
    Running,
    /// Every phase completed without error
    Completed,
    /// Connectivity check failed; no entity phase was attempted
    Aborted,
    /// Cancellation was observed between phases
    Cancelled,
    /// At least one phase failed; the remaining phases were still applied
    Failed,
}

impl SyncOutcome {
    /// Returns true if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self, SyncOutcome::Running)
    }

    /// Returns true if the run has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        !self.is_running()
    }

    /// Returns true if the run completed without error
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed)
    }
}

impl Default for SyncOutcome {
    fn default() -> Self {
        SyncOutcome::Running
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncOutcome::Running => "running",
            SyncOutcome::Completed => "completed",
            SyncOutcome::Aborted => "aborted",
            SyncOutcome::Cancelled => "cancelled",
            SyncOutcome::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// PhaseError
// ============================================================================

/// An error captured during one phase of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseError {
    /// Phase the error occurred in
    phase: SyncPhase,
    /// Human-readable error message
    message: String,
    /// When the error occurred
    timestamp: DateTime<Utc>,
}

impl PhaseError {
    /// Creates a new PhaseError
    pub fn new(phase: SyncPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns the phase the error occurred in
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns when the error occurred
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.phase,
            self.message
        )
    }
}

// ============================================================================
// SyncReport
// ============================================================================

/// Summary of one sync run
///
/// The orchestrator fills this in as phases finish and returns it to the
/// caller. Unlike [`SyncProgress`] snapshots, the report survives the run
/// and is what the CLI renders afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Identifier of this run
    run_id: RunId,
    /// When the run started
    started_at: DateTime<Utc>,
    /// When the run finished (None while running)
    finished_at: Option<DateTime<Utc>>,
    /// Terminal outcome
    outcome: SyncOutcome,
    /// Project reconcile counters
    projects: ReconcileStats,
    /// Defect reconcile counters
    defects: ReconcileStats,
    /// Inspection event reconcile counters
    events: ReconcileStats,
    /// Assets queued for download this run
    assets_total: u64,
    /// Assets that completed this run
    assets_completed: u64,
    /// Assets that failed this run
    assets_failed: u64,
    /// Errors captured across phases
    errors: Vec<PhaseError>,
}

impl SyncReport {
    /// Creates a report for a run that is starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            finished_at: None,
            outcome: SyncOutcome::Running,
            projects: ReconcileStats::new(),
            defects: ReconcileStats::new(),
            events: ReconcileStats::new(),
            assets_total: 0,
            assets_completed: 0,
            assets_failed: 0,
            errors: Vec::new(),
        }
    }

    // --- Getters ---

    /// Returns the run identifier
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns when the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished, if it has
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the run outcome
    pub fn outcome(&self) -> SyncOutcome {
        self.outcome
    }

    /// Returns the project reconcile counters
    pub fn projects(&self) -> &ReconcileStats {
        &self.projects
    }

    /// Returns the defect reconcile counters
    pub fn defects(&self) -> &ReconcileStats {
        &self.defects
    }

    /// Returns the inspection event reconcile counters
    pub fn events(&self) -> &ReconcileStats {
        &self.events
    }

    /// Returns how many assets were queued this run
    pub fn assets_total(&self) -> u64 {
        self.assets_total
    }

    /// Returns how many assets completed this run
    pub fn assets_completed(&self) -> u64 {
        self.assets_completed
    }

    /// Returns how many assets failed this run
    pub fn assets_failed(&self) -> u64 {
        self.assets_failed
    }

    /// Returns all errors captured during the run
    pub fn errors(&self) -> &[PhaseError] {
        &self.errors
    }

    /// Returns true if any phase recorded an error
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the total rows written across all entity phases
    pub fn total_writes(&self) -> u64 {
        self.projects.writes() + self.defects.writes() + self.events.writes()
    }

    /// Returns the duration of the run (so far or total)
    pub fn duration(&self) -> chrono::Duration {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }

    // --- Mutators ---

    /// Records the project phase counters
    pub fn set_projects(&mut self, stats: ReconcileStats) {
        self.projects = stats;
    }

    /// Records the defect phase counters
    pub fn set_defects(&mut self, stats: ReconcileStats) {
        self.defects = stats;
    }

    /// Records the inspection event phase counters
    pub fn set_events(&mut self, stats: ReconcileStats) {
        self.events = stats;
    }

    /// Records the asset download counters
    pub fn set_asset_counts(&mut self, total: u64, completed: u64, failed: u64) {
        self.assets_total = total;
        self.assets_completed = completed;
        self.assets_failed = failed;
    }

    /// Captures a phase error
    pub fn add_error(&mut self, error: PhaseError) {
        self.errors.push(error);
    }

    /// Finishes the run: Completed if clean, Failed if any phase errored
    pub fn finish(&mut self) {
        self.outcome = if self.errors.is_empty() {
            SyncOutcome::Completed
        } else {
            SyncOutcome::Failed
        };
        self.finished_at = Some(Utc::now());
    }

    /// Finishes the run as aborted (connectivity check failed)
    pub fn abort(&mut self) {
        self.outcome = SyncOutcome::Aborted;
        self.finished_at = Some(Utc::now());
    }

    /// Finishes the run as cancelled
    pub fn cancel(&mut self) {
        self.outcome = SyncOutcome::Cancelled;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod sync_phase_tests {
        use super::*;

        const PIPELINE: [SyncPhase; 7] = [
            SyncPhase::Init,
            SyncPhase::Ping,
            SyncPhase::SyncProjects,
            SyncPhase::SyncDefects,
            SyncPhase::SyncEvents,
            SyncPhase::SyncAssets,
            SyncPhase::Done,
        ];

        #[test]
        fn test_fractions_increase_along_pipeline() {
            for pair in PIPELINE.windows(2) {
                assert!(pair[0].base_fraction() < pair[1].base_fraction());
            }
            assert!((SyncPhase::Done.base_fraction() - 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_only_done_is_done() {
            for phase in PIPELINE {
                assert_eq!(phase.is_done(), phase == SyncPhase::Done);
            }
        }

        #[test]
        fn test_serialization_uses_snake_case() {
            let json = serde_json::to_string(&SyncPhase::SyncProjects).unwrap();
            assert_eq!(json, "\"sync_projects\"");
        }
    }

    mod sync_progress_tests {
        use super::*;

        #[test]
        fn test_fraction_is_clamped() {
            let p = SyncProgress::new(SyncPhase::Ping, "x", 1.5);
            assert!((p.fraction() - 1.0).abs() < f64::EPSILON);
            let p = SyncProgress::new(SyncPhase::Ping, "x", -0.5);
            assert!((p.fraction() - 0.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_for_phase_uses_label_and_base() {
            let p = SyncProgress::for_phase(SyncPhase::SyncDefects);
            assert_eq!(p.message(), "Syncing defects");
            assert!((p.fraction() - 0.30).abs() < f64::EPSILON);
        }

        #[test]
        fn test_downloading_interpolates() {
            let start = SyncProgress::downloading(0, 10);
            assert!((start.fraction() - 0.50).abs() < f64::EPSILON);

            let halfway = SyncProgress::downloading(5, 10);
            assert!((halfway.fraction() - 0.725).abs() < 1e-9);

            let done = SyncProgress::downloading(10, 10);
            assert!((done.fraction() - 0.95).abs() < f64::EPSILON);
            assert_eq!(done.message(), "Downloading assets (10/10)");
        }

        #[test]
        fn test_downloading_zero_total() {
            let p = SyncProgress::downloading(0, 0);
            assert!((p.fraction() - 0.50).abs() < f64::EPSILON);
        }

        #[test]
        fn test_aborted_is_terminal() {
            let p = SyncProgress::aborted("Sync aborted: server unreachable");
            assert_eq!(p.phase(), SyncPhase::Done);
            assert!((p.fraction() - 1.0).abs() < f64::EPSILON);
            assert_eq!(p.message(), "Sync aborted: server unreachable");
        }

        #[test]
        fn test_default_is_init() {
            let p = SyncProgress::default();
            assert_eq!(p.phase(), SyncPhase::Init);
            assert!((p.fraction() - 0.0).abs() < f64::EPSILON);
        }
    }

    mod reconcile_stats_tests {
        use super::*;

        #[test]
        fn test_writes_counts_all_mutations() {
            let stats = ReconcileStats {
                checked: 10,
                inserted: 2,
                updated: 3,
                skipped: 4,
                soft_deleted: 1,
                failed: 0,
            };
            assert_eq!(stats.writes(), 6);
            assert!(!stats.is_noop());
        }

        #[test]
        fn test_skips_are_not_writes() {
            let stats = ReconcileStats {
                checked: 5,
                skipped: 5,
                ..ReconcileStats::new()
            };
            assert!(stats.is_noop());
        }

        #[test]
        fn test_merge() {
            let mut total = ReconcileStats {
                checked: 3,
                inserted: 1,
                ..ReconcileStats::new()
            };
            total.merge(&ReconcileStats {
                checked: 2,
                updated: 2,
                failed: 1,
                ..ReconcileStats::new()
            });
            assert_eq!(total.checked, 5);
            assert_eq!(total.inserted, 1);
            assert_eq!(total.updated, 2);
            assert_eq!(total.failed, 1);
        }
    }

    mod sync_report_tests {
        use super::*;

        #[test]
        fn test_new_report_is_running() {
            let report = SyncReport::new();
            assert!(report.outcome().is_running());
            assert!(report.finished_at().is_none());
            assert!(!report.has_errors());
            assert_eq!(report.total_writes(), 0);
        }

        #[test]
        fn test_finish_without_errors_completes() {
            let mut report = SyncReport::new();
            report.finish();
            assert_eq!(report.outcome(), SyncOutcome::Completed);
            assert!(report.outcome().is_success());
            assert!(report.finished_at().is_some());
        }

        #[test]
        fn test_finish_with_errors_fails() {
            let mut report = SyncReport::new();
            report.add_error(PhaseError::new(
                SyncPhase::SyncDefects,
                "defect batch fetch failed",
            ));
            report.finish();
            assert_eq!(report.outcome(), SyncOutcome::Failed);
            assert!(!report.outcome().is_success());
            assert_eq!(report.errors().len(), 1);
            assert_eq!(report.errors()[0].phase(), SyncPhase::SyncDefects);
        }

        #[test]
        fn test_abort() {
            let mut report = SyncReport::new();
            report.abort();
            assert_eq!(report.outcome(), SyncOutcome::Aborted);
            assert!(report.outcome().is_finished());
        }

        #[test]
        fn test_cancel() {
            let mut report = SyncReport::new();
            report.cancel();
            assert_eq!(report.outcome(), SyncOutcome::Cancelled);
        }

        #[test]
        fn test_total_writes_spans_entity_phases() {
            let mut report = SyncReport::new();
            report.set_projects(ReconcileStats {
                inserted: 1,
                ..ReconcileStats::new()
            });
            report.set_defects(ReconcileStats {
                updated: 2,
                ..ReconcileStats::new()
            });
            report.set_events(ReconcileStats {
                soft_deleted: 3,
                ..ReconcileStats::new()
            });
            assert_eq!(report.total_writes(), 6);
        }

        #[test]
        fn test_asset_counts() {
            let mut report = SyncReport::new();
            report.set_asset_counts(10, 8, 2);
            assert_eq!(report.assets_total(), 10);
            assert_eq!(report.assets_completed(), 8);
            assert_eq!(report.assets_failed(), 2);
        }

        #[test]
        fn test_serialization_roundtrip() {
            let mut report = SyncReport::new();
            report.set_projects(ReconcileStats {
                checked: 4,
                inserted: 4,
                ..ReconcileStats::new()
            });
            report.finish();

            let json = serde_json::to_string(&report).unwrap();
            let back: SyncReport = serde_json::from_str(&json).unwrap();
            assert_eq!(report, back);
        }
    }
}
