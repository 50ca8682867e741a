//! Cleanup command - Destructive removal of one project
//!
//! Provides the `fieldsync cleanup` CLI command which hard-deletes a
//! project's catalog rows, drops its asset ownership links, and
//! removes now-orphaned assets together with their cached files.
//! Assets still owned by another project survive.

use anyhow::{Context, Result};
use clap::Args;
use fieldsync_core::config::Config;
use fieldsync_core::domain::EntityUid;

use super::build_orchestrator;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct CleanupCommand {
    /// External UID of the project to remove
    pub project: String,

    /// Actually delete; without this flag nothing is touched
    #[arg(long)]
    pub force: bool,
}

impl CleanupCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let uid: EntityUid = self
            .project
            .parse()
            .with_context(|| format!("Invalid project uid: {}", self.project))?;

        if !self.force {
            formatter.warn(&format!(
                "This permanently deletes project {} with its defects, events, and orphaned assets",
                self.project
            ));
            formatter.info("Re-run with --force to proceed");
            return Ok(());
        }

        let orchestrator = build_orchestrator(config).await?;
        let report = orchestrator.cleanup_project(&uid).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "project": self.project,
                "catalog_rows": {
                    "projects": report.catalog.projects,
                    "defects": report.catalog.defects,
                    "events": report.catalog.events,
                },
                "assets_unlinked": report.assets.unlinked,
                "assets_deleted": report.assets.deleted_assets,
                "files_removed": report.files_removed,
            }));
        } else if report.catalog.projects == 0 {
            formatter.warn(&format!("No project found with uid {}", self.project));
        } else {
            formatter.success(&format!("Removed project {}", self.project));
            formatter.info(&format!("Catalog rows: {}", report.catalog.total()));
            formatter.info(&format!("Asset links:  {}", report.assets.unlinked));
            formatter.info(&format!("Assets:       {}", report.assets.deleted_assets));
            formatter.info(&format!("Files:        {}", report.files_removed));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_command_requires_force() {
        let cmd = CleanupCommand {
            project: "proj-1".to_string(),
            force: false,
        };
        assert!(!cmd.force);
    }

    #[test]
    fn test_cleanup_command_with_force() {
        let cmd = CleanupCommand {
            project: "proj-1".to_string(),
            force: true,
        };
        assert!(cmd.force);
        assert_eq!(cmd.project, "proj-1");
    }
}
