//! Sync command - Run a full sync pass
//!
//! Provides the `fieldsync sync` CLI command which:
//! 1. Opens the local stores and builds the API client
//! 2. Runs the phased sync pass with a live progress line
//! 3. Renders the run report (human or JSON)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use fieldsync_core::config::Config;
use fieldsync_core::domain::{SyncOutcome, SyncReport};
use tracing::info;

use super::build_orchestrator;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Suppress the live progress line
    #[arg(long)]
    pub no_progress: bool,
}

impl SyncCommand {
    /// Execute the sync command
    ///
    /// Wires the adapters, runs the orchestrator, and renders the
    /// report. Progress snapshots go to stderr so stdout stays clean
    /// for JSON consumers.
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let orchestrator = Arc::new(build_orchestrator(config).await?);
        info!("Starting sync pass");

        // Live progress line, rewritten in place on stderr
        let progress_task = if self.no_progress || format.is_json() {
            None
        } else {
            let mut rx = orchestrator.subscribe();
            Some(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let snapshot = rx.borrow_and_update().clone();
                    eprint!("\r{snapshot}        ");
                    if snapshot.phase().is_done() {
                        eprintln!();
                        break;
                    }
                }
            }))
        };

        let result = orchestrator.run_full_sync().await;
        if let Some(task) = progress_task {
            match &result {
                // The run always ends on a Done snapshot, so the
                // printer terminates on its own
                Ok(_) => {
                    let _ = task.await;
                }
                Err(_) => task.abort(),
            }
        }
        let report = result?;

        render_report(&report, format, formatter.as_ref())
    }
}

fn render_report(
    report: &SyncReport,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    if format.is_json() {
        let json = serde_json::to_value(report).context("Failed to serialize sync report")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let duration_display = duration_display(report.duration().num_milliseconds());

    match report.outcome() {
        SyncOutcome::Completed if report.total_writes() == 0 && report.assets_total() == 0 => {
            formatter.success(&format!("Already up to date ({duration_display})"));
        }
        SyncOutcome::Completed => {
            formatter.success(&format!("Sync completed in {duration_display}"));
        }
        SyncOutcome::Aborted => {
            formatter.error("Sync aborted: server unreachable");
        }
        SyncOutcome::Cancelled => {
            formatter.warn("Sync cancelled");
        }
        SyncOutcome::Failed => {
            formatter.warn(&format!("Sync finished with errors in {duration_display}"));
        }
        SyncOutcome::Running => {}
    }

    // Row counters per entity class
    for (label, stats) in [
        ("Projects:", report.projects()),
        ("Defects: ", report.defects()),
        ("Events:  ", report.events()),
    ] {
        if stats.checked > 0 || stats.soft_deleted > 0 {
            formatter.info(&format!(
                "{} {} checked, {} new, {} updated, {} unchanged, {} removed",
                label, stats.checked, stats.inserted, stats.updated, stats.skipped,
                stats.soft_deleted
            ));
        }
    }
    if report.assets_total() > 0 {
        formatter.info(&format!(
            "Assets:   {} queued, {} downloaded, {} failed",
            report.assets_total(),
            report.assets_completed(),
            report.assets_failed()
        ));
    }

    if report.has_errors() {
        formatter.error(&format!(
            "{} phase error{}:",
            report.errors().len(),
            if report.errors().len() == 1 { "" } else { "s" }
        ));
        for err in report.errors() {
            formatter.info(&format!("  - [{}] {}", err.phase(), err.message()));
        }
    }

    Ok(())
}

/// Format a millisecond duration as a short human string.
fn duration_display(ms: i64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_command_default() {
        let cmd = SyncCommand { no_progress: false };
        assert!(!cmd.no_progress);
    }

    #[test]
    fn test_duration_display_millis() {
        assert_eq!(duration_display(0), "0ms");
        assert_eq!(duration_display(999), "999ms");
    }

    #[test]
    fn test_duration_display_seconds() {
        assert_eq!(duration_display(1000), "1.0s");
        assert_eq!(duration_display(2350), "2.4s");
    }
}
