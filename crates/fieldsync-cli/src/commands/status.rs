//! Status command - Show catalog and download queue state
//!
//! Provides the `fieldsync status` CLI command which:
//! 1. Counts live catalog rows per entity class
//! 2. Counts asset rows per download status
//! 3. Checks the cache state of a single asset when a node id is given

use anyhow::{Context, Result};
use clap::Args;
use fieldsync_core::config::Config;
use fieldsync_core::domain::NodeId;

use super::build_orchestrator;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Asset node id to check instead of the global summary
    pub node: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let orchestrator = build_orchestrator(config).await?;

        // Single-asset probe
        if let Some(raw) = &self.node {
            let node_id: NodeId = raw
                .parse()
                .with_context(|| format!("Invalid node id: {raw}"))?;
            let cached = orchestrator.is_asset_cached(&node_id).await?;

            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "node_id": raw,
                    "cached": cached,
                }));
            } else if cached {
                formatter.success(&format!("{raw} is cached locally"));
            } else {
                formatter.warn(&format!("{raw} is not cached"));
            }
            return Ok(());
        }

        let snapshot = orchestrator.status().await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "catalog": {
                    "projects": snapshot.catalog.projects,
                    "defects": snapshot.catalog.defects,
                    "events": snapshot.catalog.events,
                },
                "assets": {
                    "pending": snapshot.assets.pending,
                    "resolving": snapshot.assets.resolving,
                    "downloading": snapshot.assets.downloading,
                    "completed": snapshot.assets.completed,
                    "failed": snapshot.assets.failed,
                    "total": snapshot.assets.total(),
                },
            }));
        } else {
            formatter.success("Catalog");
            formatter.info(&format!("Projects:  {}", snapshot.catalog.projects));
            formatter.info(&format!("Defects:   {}", snapshot.catalog.defects));
            formatter.info(&format!("Events:    {}", snapshot.catalog.events));

            formatter.success("Assets");
            formatter.info(&format!("Completed: {}", snapshot.assets.completed));
            formatter.info(&format!("Pending:   {}", snapshot.assets.pending));
            formatter.info(&format!("Failed:    {}", snapshot.assets.failed));
            let in_flight = snapshot.assets.resolving + snapshot.assets.downloading;
            if in_flight > 0 {
                formatter.info(&format!("In flight: {in_flight}"));
            }
            formatter.info(&format!("Total:     {}", snapshot.assets.total()));
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
    fn test_status_command_default() {
        let cmd = StatusCommand { node: None };
        assert!(cmd.node.is_none());
    }

    #[test]
    fn test_status_command_with_node() {
        let cmd = StatusCommand {
            node: Some("node-1".to_string()),
        };
        assert_eq!(cmd.node.as_deref(), Some("node-1"));
    }
}
