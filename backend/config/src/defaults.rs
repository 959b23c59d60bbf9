//! Config defaults: fills every unset field the pipeline reads.

use crate::schema::{
    BendlineConfig, CatalogConfig, LoggingConfig, MappingConfig, PrefilterConfig, StoreConfig,
    VisionConfig,
};

pub const DEFAULT_VISION_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_CATALOG_PATH: &str = "catalog/shapes.json";
pub const DEFAULT_CATALOG_IMAGES_DIR: &str = "catalog/images";
pub const DEFAULT_ORDERS_DIR: &str = "orders";
pub const DEFAULT_MAX_BACKUPS: usize = 3;

pub const DEFAULT_INK_THRESHOLD: u8 = 128;
pub const DEFAULT_RULE_VOTE_FRACTION: f32 = 0.5;
pub const DEFAULT_STROKE_VOTES: u32 = 40;
pub const DEFAULT_MIN_LINES: usize = 2;
pub const DEFAULT_MIN_CONTOURS: usize = 1;
pub const DEFAULT_MIN_ROW_HEIGHT: u32 = 20;

pub const DEFAULT_ON_CONTRACT_VIOLATION: &str = "report";

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: BendlineConfig) -> BendlineConfig {
    let config = apply_vision_defaults(config);
    let config = apply_path_defaults(config);
    let config = apply_prefilter_defaults(config);
    let config = apply_mapping_defaults(config);
    apply_logging_defaults(config)
}

/// Provider, model (per provider), token budget and timeout.
fn apply_vision_defaults(mut config: BendlineConfig) -> BendlineConfig {
    let vision = config.vision.get_or_insert_with(VisionConfig::default);
    let provider = vision
        .provider
        .get_or_insert_with(|| DEFAULT_VISION_PROVIDER.to_string())
        .clone();
    if vision.model.is_none() {
        let model = if provider == "gemini" {
            DEFAULT_GEMINI_MODEL
        } else {
            DEFAULT_OPENAI_MODEL
        };
        vision.model = Some(model.to_string());
    }
    vision.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    vision.temperature.get_or_insert(0.0);
    vision.timeout_secs.get_or_insert(DEFAULT_TIMEOUT_SECS);
    config
}

fn apply_path_defaults(mut config: BendlineConfig) -> BendlineConfig {
    let catalog = config.catalog.get_or_insert_with(CatalogConfig::default);
    catalog
        .path
        .get_or_insert_with(|| DEFAULT_CATALOG_PATH.to_string());
    catalog
        .images_dir
        .get_or_insert_with(|| DEFAULT_CATALOG_IMAGES_DIR.to_string());

    let store = config.store.get_or_insert_with(StoreConfig::default);
    store
        .orders_dir
        .get_or_insert_with(|| DEFAULT_ORDERS_DIR.to_string());
    store.max_backups.get_or_insert(DEFAULT_MAX_BACKUPS);
    config
}

fn apply_prefilter_defaults(mut config: BendlineConfig) -> BendlineConfig {
    let p = config.prefilter.get_or_insert_with(PrefilterConfig::default);
    p.ink_threshold.get_or_insert(DEFAULT_INK_THRESHOLD);
    p.rule_vote_fraction.get_or_insert(DEFAULT_RULE_VOTE_FRACTION);
    p.stroke_votes.get_or_insert(DEFAULT_STROKE_VOTES);
    p.min_lines.get_or_insert(DEFAULT_MIN_LINES);
    p.min_contours.get_or_insert(DEFAULT_MIN_CONTOURS);
    p.min_row_height.get_or_insert(DEFAULT_MIN_ROW_HEIGHT);
    config
}

fn apply_mapping_defaults(mut config: BendlineConfig) -> BendlineConfig {
    let mapping = config.mapping.get_or_insert_with(MappingConfig::default);
    mapping
        .on_contract_violation
        .get_or_insert_with(|| DEFAULT_ON_CONTRACT_VIOLATION.to_string());
    mapping.require_drawing.get_or_insert(true);
    config
}

fn apply_logging_defaults(mut config: BendlineConfig) -> BendlineConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(BendlineConfig::default());
        let vision = cfg.vision.unwrap();
        assert_eq!(vision.provider.unwrap(), DEFAULT_VISION_PROVIDER);
        assert_eq!(vision.model.unwrap(), DEFAULT_OPENAI_MODEL);
        assert_eq!(cfg.store.unwrap().orders_dir.unwrap(), DEFAULT_ORDERS_DIR);
        assert_eq!(
            cfg.mapping.unwrap().on_contract_violation.unwrap(),
            DEFAULT_ON_CONTRACT_VIOLATION
        );
    }

    #[test]
    fn gemini_gets_gemini_model() {
        let mut cfg = BendlineConfig::default();
        cfg.vision = Some(VisionConfig {
            provider: Some("gemini".to_string()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.vision.unwrap().model.unwrap(), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn does_not_override_user_thresholds() {
        let mut cfg = BendlineConfig::default();
        cfg.prefilter = Some(PrefilterConfig {
            min_lines: Some(7),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        let p = cfg.prefilter.unwrap();
        assert_eq!(p.min_lines.unwrap(), 7);
        assert_eq!(p.ink_threshold.unwrap(), DEFAULT_INK_THRESHOLD);
    }
}
