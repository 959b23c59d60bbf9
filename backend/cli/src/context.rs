//! Turns the prepared config into the settings each pipeline stage takes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use bendline_catalog::Catalog;
use bendline_config::defaults::*;
use bendline_config::BendlineConfig;
use bendline_core::VisionProvider;
use bendline_media::{GridOptions, ShapeCheckOptions};
use bendline_store::OrderStore;
use bendline_vision::{
    MapperSettings, ProviderRegistry, ProviderSettings, RibMapper, ViolationPolicy,
};

pub struct AppContext {
    pub config: BendlineConfig,
}

impl AppContext {
    pub fn new(config: BendlineConfig) -> Self {
        Self { config }
    }

    pub fn grid_options(&self) -> GridOptions {
        let p = self.config.prefilter.clone().unwrap_or_default();
        GridOptions {
            ink_threshold: p.ink_threshold.unwrap_or(DEFAULT_INK_THRESHOLD),
            rule_vote_fraction: p.rule_vote_fraction.unwrap_or(DEFAULT_RULE_VOTE_FRACTION),
            min_row_height: p.min_row_height.unwrap_or(DEFAULT_MIN_ROW_HEIGHT),
            ..Default::default()
        }
    }

    pub fn shape_check_options(&self) -> ShapeCheckOptions {
        let p = self.config.prefilter.clone().unwrap_or_default();
        ShapeCheckOptions {
            ink_threshold: p.ink_threshold.unwrap_or(DEFAULT_INK_THRESHOLD),
            stroke_votes: p.stroke_votes.unwrap_or(DEFAULT_STROKE_VOTES),
            min_lines: p.min_lines.unwrap_or(DEFAULT_MIN_LINES),
            min_contours: p.min_contours.unwrap_or(DEFAULT_MIN_CONTOURS),
            ..Default::default()
        }
    }

    pub fn mapper_settings(&self) -> Result<MapperSettings> {
        let vision = self.config.vision.clone().unwrap_or_default();
        let mapping = self.config.mapping.clone().unwrap_or_default();
        let policy: ViolationPolicy = mapping
            .on_contract_violation
            .as_deref()
            .unwrap_or(DEFAULT_ON_CONTRACT_VIOLATION)
            .parse()?;
        Ok(MapperSettings {
            model: vision
                .model
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: vision.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: vision.temperature.unwrap_or(0.0),
            policy,
            require_drawing: mapping.require_drawing.unwrap_or(true),
            shape_check: self.shape_check_options(),
        })
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        let vision = self.config.vision.clone().unwrap_or_default();
        ProviderSettings {
            provider: vision
                .provider
                .unwrap_or_else(|| DEFAULT_VISION_PROVIDER.to_string()),
            api_key: vision.api_key,
            base_url: vision.base_url,
            timeout: Duration::from_secs(vision.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn provider(&self) -> Result<Arc<dyn VisionProvider>> {
        let settings = self.provider_settings();
        let registry = ProviderRegistry::from_settings(&settings)?;
        Ok(registry.get(&settings.provider)?)
    }

    pub fn mapper(&self) -> Result<RibMapper> {
        Ok(RibMapper::new(self.provider()?, self.mapper_settings()?))
    }

    pub fn catalog_path(&self) -> PathBuf {
        let catalog = self.config.catalog.clone().unwrap_or_default();
        PathBuf::from(catalog.path.unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()))
    }

    pub fn catalog_images_dir(&self) -> PathBuf {
        let catalog = self.config.catalog.clone().unwrap_or_default();
        PathBuf::from(
            catalog
                .images_dir
                .unwrap_or_else(|| DEFAULT_CATALOG_IMAGES_DIR.to_string()),
        )
    }

    pub async fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.catalog_path()).await
    }

    pub async fn open_store(&self) -> Result<OrderStore> {
        let store = self.config.store.clone().unwrap_or_default();
        OrderStore::open(
            store
                .orders_dir
                .unwrap_or_else(|| DEFAULT_ORDERS_DIR.to_string()),
            store.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bendline_config::apply_all_defaults;

    fn context(yaml: &str) -> AppContext {
        let config: BendlineConfig = serde_yaml::from_str(yaml).unwrap();
        AppContext::new(apply_all_defaults(config))
    }

    #[test]
    fn defaults_flow_into_stage_settings() {
        let ctx = context("{}");
        let grid = ctx.grid_options();
        assert_eq!(grid.ink_threshold, DEFAULT_INK_THRESHOLD);
        assert_eq!(grid.min_row_height, DEFAULT_MIN_ROW_HEIGHT);

        let mapper = ctx.mapper_settings().unwrap();
        assert_eq!(mapper.policy, ViolationPolicy::Report);
        assert!(mapper.require_drawing);
        assert_eq!(mapper.shape_check.stroke_votes, DEFAULT_STROKE_VOTES);
        assert_eq!(ctx.catalog_path(), PathBuf::from(DEFAULT_CATALOG_PATH));
    }

    #[test]
    fn overrides_are_honored() {
        let ctx = context(
            r#"
vision:
  provider: gemini
  timeoutSecs: 5
prefilter:
  minLines: 4
mapping:
  onContractViolation: reject
  requireDrawing: false
"#,
        );
        let mapper = ctx.mapper_settings().unwrap();
        assert_eq!(mapper.policy, ViolationPolicy::Reject);
        assert!(!mapper.require_drawing);
        assert_eq!(mapper.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(mapper.shape_check.min_lines, 4);

        let provider = ctx.provider_settings();
        assert_eq!(provider.provider, "gemini");
        assert_eq!(provider.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_api_key_is_reported_when_building_the_provider() {
        let ctx = context("vision:\n  provider: openai\n");
        let err = ctx.provider().err().unwrap();
        assert!(err.to_string().contains("configuration error"));
    }
}
