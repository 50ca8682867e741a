//! Config command - View and validate FieldSync configuration
//!
//! Provides the `fieldsync config` CLI command which:
//! 1. Prints the resolved configuration file path
//! 2. Shows the effective configuration (YAML or JSON)
//! 3. Validates the configuration file and lists field errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use fieldsync_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Path => execute_path(config_path, format),
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
        }
    }
}

fn execute_path(config_path: &Path, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        let formatter = get_formatter(format);
        formatter.print_json(&serde_json::json!({
            "config_path": config_path.display().to_string(),
            "exists": config_path.exists(),
        }));
    } else {
        // Bare path so it composes in shell substitutions
        println!("{}", config_path.display());
    }
    Ok(())
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        formatter.warn(&format!(
            "No configuration file at {}; defaults are in effect",
            config_path.display()
        ));
        return Ok(());
    }

    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let errors = config.validate();

    if format.is_json() {
        let error_list: Vec<_> = errors
            .iter()
            .map(|e| serde_json::json!({"field": e.field, "message": e.message}))
            .collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": error_list,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
    } else {
        formatter.error(&format!(
            "{} validation error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        for err in &errors {
            formatter.info(&format!("  - {err}"));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
