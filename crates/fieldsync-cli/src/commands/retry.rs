//! Retry command - Re-queue failed downloads or force one re-fetch
//!
//! Provides the `fieldsync retry` CLI command. Without arguments every
//! failed asset is put back in the queue and the queue is drained.
//! With `--node`, that one already-cached asset is reset and fetched
//! again, replacing its local content.

use anyhow::{Context, Result};
use clap::Args;
use fieldsync_core::config::Config;
use fieldsync_core::domain::NodeId;
use fieldsync_engine::DownloadStats;

use super::build_orchestrator;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct RetryCommand {
    /// Re-fetch this one asset instead of sweeping failed ones
    #[arg(long)]
    pub node: Option<String>,
}

impl RetryCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let orchestrator = build_orchestrator(config).await?;

        let stats = match &self.node {
            Some(raw) => {
                let node_id: NodeId = raw
                    .parse()
                    .with_context(|| format!("Invalid node id: {raw}"))?;
                orchestrator.refetch_asset(&node_id).await?
            }
            None => orchestrator.retry_failed_assets().await?,
        };

        render_stats(&stats, format, formatter.as_ref());
        Ok(())
    }
}

fn render_stats(stats: &DownloadStats, format: OutputFormat, formatter: &dyn OutputFormatter) {
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "queued": stats.total,
            "completed": stats.completed,
            "failed": stats.failed,
            "skipped": stats.skipped,
        }));
        return;
    }

    if stats.total == 0 {
        formatter.success("Nothing to download");
        return;
    }

    formatter.success(&format!(
        "Downloaded {} of {} asset{}",
        stats.completed,
        stats.total,
        if stats.total == 1 { "" } else { "s" }
    ));
    if stats.failed > 0 {
        formatter.warn(&format!(
            "{} download{} failed",
            stats.failed,
            if stats.failed == 1 { "" } else { "s" }
        ));
    }
    if stats.skipped > 0 {
        formatter.info(&format!("Skipped (already in flight): {}", stats.skipped));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_command_default() {
        let cmd = RetryCommand { node: None };
        assert!(cmd.node.is_none());
    }

    #[test]
    fn test_retry_command_with_node() {
        let cmd = RetryCommand {
            node: Some("node-7".to_string()),
        };
        assert_eq!(cmd.node.as_deref(), Some("node-7"));
    }
}
