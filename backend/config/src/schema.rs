//! Bendline configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional so a
//! partial file (or no file at all) loads, and defaults fill the gaps.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for Bendline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BendlineConfig {
    /// Vision model used for rib/angle mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionConfig>,

    /// Shape catalog location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,

    /// Order record store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Line/grid detection thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<PrefilterConfig>,

    /// Mapping contract policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    /// "openai" | "gemini"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Override for OpenAI-compatible gateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Catalog / store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Path to the catalog JSON file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Directory holding `shape_{number}.png` reference drawings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<usize>,
}

// ---------------------------------------------------------------------------
// Image heuristics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefilterConfig {
    /// Gray level below which a pixel counts as ink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ink_threshold: Option<u8>,
    /// Hough accumulator votes a table rule needs, as a fraction of the image side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_vote_fraction: Option<f32>,
    /// Hough votes a stroke in a shape crop needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_votes: Option<u32>,
    /// Minimum strokes before a crop counts as a drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lines: Option<usize>,
    /// Minimum outer contours before a crop counts as a drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_contours: Option<usize>,
    /// Minimum height in pixels for a table row band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_row_height: Option<u32>,
}

// ---------------------------------------------------------------------------
// Mapping policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// "report" keeps the result and lists issues; "reject" fails the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_contract_violation: Option<String>,
    /// Refuse to call the model when the order crop holds no drawing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_drawing: Option<bool>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
