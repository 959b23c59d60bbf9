//! Config validation: deep checks with user-friendly error messages.

use crate::schema::BendlineConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &BendlineConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_vision(config, &mut report);
    validate_store(config, &mut report);
    validate_prefilter(config, &mut report);
    validate_mapping(config, &mut report);
    report
}

fn validate_vision(config: &BendlineConfig, report: &mut ValidationReport) {
    let Some(vision) = &config.vision else { return };
    if let Some(provider) = &vision.provider {
        if !matches!(provider.as_str(), "openai" | "gemini") {
            report.error(
                "vision.provider",
                format!("Unknown vision provider '{provider}'. Use 'openai' or 'gemini'"),
            );
        }
    }
    if vision.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        report.warn("vision.apiKey", "No API key configured; mapping calls will fail");
    }
    if let Some(t) = vision.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("vision.temperature", "temperature must be within 0.0..=2.0");
        }
    }
    if vision.max_tokens == Some(0) {
        report.error("vision.maxTokens", "maxTokens must be > 0");
    }
    if vision.timeout_secs == Some(0) {
        report.error("vision.timeoutSecs", "timeoutSecs must be > 0");
    }
}

fn validate_store(config: &BendlineConfig, report: &mut ValidationReport) {
    let Some(store) = &config.store else { return };
    if store.orders_dir.as_deref().map(str::trim) == Some("") {
        report.error("store.ordersDir", "ordersDir cannot be empty");
    }
    if store.max_backups == Some(0) {
        report.warn("store.maxBackups", "Backups disabled; edits cannot be rolled back");
    }
}

fn validate_prefilter(config: &BendlineConfig, report: &mut ValidationReport) {
    let Some(p) = &config.prefilter else { return };
    if let Some(f) = p.rule_vote_fraction {
        if !(f > 0.0 && f <= 1.0) {
            report.error("prefilter.ruleVoteFraction", "ruleVoteFraction must be within (0, 1]");
        }
    }
    if p.stroke_votes == Some(0) {
        report.error("prefilter.strokeVotes", "strokeVotes must be > 0");
    }
    if p.ink_threshold == Some(0) {
        report.warn("prefilter.inkThreshold", "inkThreshold 0 treats no pixel as ink");
    }
}

fn validate_mapping(config: &BendlineConfig, report: &mut ValidationReport) {
    let Some(mapping) = &config.mapping else { return };
    if let Some(policy) = &mapping.on_contract_violation {
        if !matches!(policy.as_str(), "report" | "reject") {
            report.error(
                "mapping.onContractViolation",
                format!("Unknown policy '{policy}'. Use 'report' or 'reject'"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MappingConfig, PrefilterConfig, VisionConfig};

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&BendlineConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn unknown_provider_is_error() {
        let mut cfg = BendlineConfig::default();
        cfg.vision = Some(VisionConfig {
            provider: Some("tesseract".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "vision.provider");
    }

    #[test]
    fn missing_api_key_is_warning() {
        let mut cfg = BendlineConfig::default();
        cfg.vision = Some(VisionConfig::default());
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.path == "vision.apiKey"));
    }

    #[test]
    fn bad_policy_and_fraction_are_errors() {
        let mut cfg = BendlineConfig::default();
        cfg.mapping = Some(MappingConfig {
            on_contract_violation: Some("ignore".to_string()),
            ..Default::default()
        });
        cfg.prefilter = Some(PrefilterConfig {
            rule_vote_fraction: Some(1.5),
            ..Default::default()
        });
        let report = validate(&cfg);
        assert_eq!(report.errors.len(), 2);
    }
}
