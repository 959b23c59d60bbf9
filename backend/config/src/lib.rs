//! `bendline-config`: runtime configuration for the Bendline pipeline.
//!
//! Provides:
//! - Typed config schema (vision provider, catalog, store, heuristics, policy)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{apply_merge_patch, config_dir, config_file_path, load_config, write_config};
pub use redact::{collect_redacted_paths, redact};
pub use schema::BendlineConfig;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Substitute env vars, apply defaults, and validate an already loaded config.
///
/// Validation problems are returned in the report, not raised.
pub fn prepare(raw_config: &BendlineConfig) -> Result<(BendlineConfig, ValidationReport)> {
    let value: Value = serde_json::to_value(raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: BendlineConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);
    let report = validate(&config);
    Ok((config, report))
}

/// Load, substitute env vars, apply defaults, and validate a config file.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<BendlineConfig> {
    let (config, report) = prepare(&load_config(path).await?)?;
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_reports_errors_without_failing() {
        let raw: BendlineConfig =
            serde_yaml::from_str("vision:\n  provider: claude\n").unwrap();
        let (config, report) = prepare(&raw).unwrap();
        assert_eq!(config.vision.unwrap().provider.as_deref(), Some("claude"));
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "vision.provider");
    }

    #[tokio::test]
    async fn load_and_prepare_fails_on_first_error() {
        let dir = std::env::temp_dir().join(format!("bendline-prepare-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "vision:\n  provider: claude\n").unwrap();

        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("Unknown vision provider"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
