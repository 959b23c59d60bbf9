//! `config show` and `config set`: inspect and edit the config file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::{Map, Value};
use tracing::info;

use bendline_config::{
    apply_merge_patch, collect_redacted_paths, load_config, prepare, redact, write_config,
    ValidationReport,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Subcommand, Clone, Default)]
pub enum ConfigAction {
    /// Print the effective config with secrets masked (default)
    #[default]
    Show,
    /// Set one key, e.g. `mapping.onContractViolation reject`; "null" removes it
    Set { key: String, value: String },
}

/// Returns `Ok(false)` when the shown config does not validate.
pub async fn run(path: &Path, action: ConfigAction) -> Result<bool> {
    match action {
        ConfigAction::Show => show(path).await,
        ConfigAction::Set { key, value } => {
            set(path, &key, &value).await?;
            Ok(true)
        }
    }
}

async fn show(path: &Path) -> Result<bool> {
    let (config, report) = prepare(&load_config(path).await?)?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let masked = redact(&value);

    note_info(&format!("Config file: {}", path.display()));
    println!(
        "{}",
        serde_yaml::to_string(&masked).context("Failed to render config as YAML")?
    );

    let redacted = collect_redacted_paths(&value);
    if !redacted.is_empty() {
        note_info(&format!("Masked: {}", redacted.join(", ")));
    }

    print_report(&report);
    if report.is_valid() {
        note_success("Config is valid");
    }
    Ok(report.is_valid())
}

fn print_report(report: &ValidationReport) {
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
}

/// Command-line values are read as YAML scalars, so `5` is a number and
/// `null` deletes the key. Anything YAML rejects stays a plain string.
fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Merge patch that sets the dotted `key` to `value`.
fn patch_for(key: &str, value: Value) -> Result<Value> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        bail!("invalid config key '{key}'");
    }
    Ok(segments.into_iter().rev().fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    }))
}

async fn set(path: &Path, key: &str, raw_value: &str) -> Result<()> {
    let value = parse_scalar(raw_value);
    let removing = value.is_null();
    let raw = load_config(path).await?;
    let patched = apply_merge_patch(&raw, &patch_for(key, value)?)?;

    if !removing {
        let written = serde_json::to_value(&patched).context("Failed to serialize config")?;
        if written.pointer(&format!("/{}", key.replace('.', "/"))).is_none() {
            bail!("unknown config key '{key}'");
        }
    }

    let (_, report) = prepare(&patched)?;
    print_report(&report);
    if !report.is_valid() {
        bail!("config not written: {key} would make it invalid");
    }

    write_config(&patched, path).await?;
    info!(path = %path.display(), key, "Config updated");
    if removing {
        note_success(&format!("Removed {key} from {}", path.display()));
    } else {
        note_success(&format!("Set {key} in {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bendline_config::BendlineConfig;
    use uuid::Uuid;

    fn temp_config() -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("bendline-config-cmd-{}", Uuid::new_v4()))
            .join("config.yaml")
    }

    #[test]
    fn dotted_key_becomes_nested_patch() {
        let patch = patch_for("mapping.onContractViolation", parse_scalar("reject")).unwrap();
        assert_eq!(patch, serde_json::json!({"mapping": {"onContractViolation": "reject"}}));
        assert_eq!(parse_scalar("5"), serde_json::json!(5));
        assert!(parse_scalar("null").is_null());
        assert!(patch_for("mapping..policy", Value::Null).is_err());
    }

    #[tokio::test]
    async fn set_writes_valid_changes_with_backup() {
        let path = temp_config();
        set(&path, "mapping.onContractViolation", "reject").await.unwrap();
        set(&path, "store.maxBackups", "7").await.unwrap();

        let config: BendlineConfig = load_config(&path).await.unwrap();
        let mapping = config.mapping.unwrap();
        assert_eq!(mapping.on_contract_violation.as_deref(), Some("reject"));
        assert_eq!(config.store.unwrap().max_backups, Some(7));
        assert!(path.with_extension("yaml.bak.1").exists());

        set(&path, "store", "null").await.unwrap();
        assert!(load_config(&path).await.unwrap().store.is_none());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn set_refuses_unknown_or_invalid_values() {
        let path = temp_config();
        set(&path, "logging.level", "debug").await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = set(&path, "mapping.bogus", "1").await.unwrap_err();
        assert!(err.to_string().contains("unknown config key"));
        let err = set(&path, "vision.provider", "claude").await.unwrap_err();
        assert!(err.to_string().contains("config not written"));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
