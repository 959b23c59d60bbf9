//! Catalog-to-order rib mapping.
//!
//! One call sends the catalog drawing and the order crop to the vision
//! model and returns one value per requested letter. Provider failures come
//! back as a failed `MappingResult` with no mappings and are not retried.
//! Unparseable output is a hard error. Contract issues are reported on the
//! result, or turned into an error under `ViolationPolicy::Reject`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use bendline_core::{
    validate_letter_list, BendlineError, ImageInput, LetterSpec, MappingResult, VisionProvider,
    VisionRequest,
};
use bendline_logging::{redact_sensitive_data, PipelineEvent, PipelineEventLogger};
use bendline_media::{check_shape_crop, load_image, read_image_bytes, ShapeCheckOptions};

use crate::prompt::{build_mapping_prompt, MAPPING_SYSTEM_PROMPT};
use crate::response::{enforce_right_angles, extract_entries, parse_model_output, validate_contract};

/// What to do when the model response breaks the one-entry-per-letter rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViolationPolicy {
    /// Keep the repaired result and list the issues on it.
    #[default]
    Report,
    /// Fail the call.
    Reject,
}

impl std::str::FromStr for ViolationPolicy {
    type Err = BendlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report" => Ok(Self::Report),
            "reject" => Ok(Self::Reject),
            other => Err(BendlineError::Config(format!(
                "unknown contract violation policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapperSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub policy: ViolationPolicy,
    /// Run the shape pre-filter on the order crop before calling the model.
    pub require_drawing: bool,
    pub shape_check: ShapeCheckOptions,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            policy: ViolationPolicy::Report,
            require_drawing: true,
            shape_check: ShapeCheckOptions::default(),
        }
    }
}

pub struct RibMapper {
    provider: Arc<dyn VisionProvider>,
    settings: MapperSettings,
}

impl RibMapper {
    pub fn new(provider: Arc<dyn VisionProvider>, settings: MapperSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    /// Map the letters of catalog shape `shape_number` onto the values drawn
    /// in `order_image`.
    ///
    /// On success every letter in `letters` has exactly one mapping and every
    /// catalog right angle reads 90.
    pub async fn map_catalog_to_order(
        &self,
        shape_number: &str,
        catalog_image: &Path,
        order_image: &Path,
        letters: &[LetterSpec],
    ) -> Result<MappingResult, BendlineError> {
        if letters.is_empty() {
            return Err(BendlineError::InvalidLetterList(format!(
                "shape {shape_number} has no letters to map"
            )));
        }
        validate_letter_list(letters)?;

        let (catalog_bytes, catalog_mime) = read_image_bytes(catalog_image).await?;
        let (order_bytes, order_mime) = read_image_bytes(order_image).await?;

        if self.settings.require_drawing {
            self.ensure_drawing(order_image).await?;
        }

        let run_id = Uuid::new_v4();
        let request = VisionRequest {
            model: self.settings.model.clone(),
            system_prompt: MAPPING_SYSTEM_PROMPT.to_string(),
            user_prompt: build_mapping_prompt(shape_number, letters),
            images: vec![
                ImageInput {
                    label: "catalog".to_string(),
                    mime_type: catalog_mime.to_string(),
                    data: catalog_bytes,
                },
                ImageInput {
                    label: "order".to_string(),
                    mime_type: order_mime.to_string(),
                    data: order_bytes,
                },
            ],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        PipelineEventLogger::log_event(
            run_id,
            PipelineEvent::MappingRequested {
                shape: shape_number.to_string(),
                provider: self.provider.name().to_string(),
                letters: letters.len(),
            },
        );

        let start = Instant::now();
        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                let message = redact_sensitive_data(&format!("{e:#}"));
                PipelineEventLogger::log_event(
                    run_id,
                    PipelineEvent::ProviderFailed {
                        provider: self.provider.name().to_string(),
                        error: message.clone(),
                    },
                );
                return Ok(MappingResult::failed(message));
            }
        };
        debug!(
            provider = %response.provider,
            tokens = response.tokens_used,
            latency_ms = response.latency_ms,
            "Vision provider responded"
        );

        let doc = parse_model_output(&response.content)?;
        let entries = extract_entries(&doc)?;
        let report = validate_contract(entries, letters);
        let mut mappings = report.mappings;
        let mut issues = report.issues;
        issues.extend(enforce_right_angles(&mut mappings, letters));

        let result = MappingResult {
            mappings,
            issues,
            error: None,
        };

        if result.has_violations() {
            let detail = result
                .issues
                .iter()
                .filter(|i| i.is_violation())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            PipelineEventLogger::log_event(
                run_id,
                PipelineEvent::ContractViolation {
                    shape: shape_number.to_string(),
                    detail: detail.clone(),
                },
            );
            if self.settings.policy == ViolationPolicy::Reject {
                return Err(BendlineError::ContractViolation(detail));
            }
        }

        let unresolved = result.mappings.values().filter(|m| m.value.is_none()).count();
        PipelineEventLogger::log_event(
            run_id,
            PipelineEvent::MappingCompleted {
                shape: shape_number.to_string(),
                mapped: result.mappings.len() - unresolved,
                unresolved,
                issues: result.issues.len(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        );
        info!(shape = %shape_number, letters = letters.len(), unresolved, "Mapped order line");
        Ok(result)
    }

    async fn ensure_drawing(&self, order_image: &Path) -> Result<(), BendlineError> {
        let path: PathBuf = order_image.to_path_buf();
        let options = self.settings.shape_check;
        let check = tokio::task::spawn_blocking(move || {
            load_image(&path).map(|img| check_shape_crop(&img, &options))
        })
        .await
        .map_err(|e| BendlineError::Other(e.into()))??;

        if !check.has_drawing {
            warn!(
                image = %order_image.display(),
                lines = check.line_count,
                contours = check.contour_count,
                "Order crop holds no drawing"
            );
            return Err(BendlineError::NoDrawing(order_image.display().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockVisionProvider;
    use bendline_core::{ContractIssue, LetterMapping, RIGHT_ANGLE_DEGREES};
    use image::{GrayImage, Luma};

    struct Fixture {
        dir: PathBuf,
        catalog: PathBuf,
        order: PathBuf,
        blank: PathBuf,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("bendline-mapper-{tag}-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();

            let mut drawing = GrayImage::from_pixel(100, 100, Luma([255u8]));
            for y in 10..90 {
                for x in 20..25 {
                    drawing.put_pixel(x, y, Luma([0u8]));
                }
            }
            for y in 85..90 {
                for x in 20..90 {
                    drawing.put_pixel(x, y, Luma([0u8]));
                }
            }
            let catalog = dir.join("shape_104.png");
            let order = dir.join("order_line.png");
            let blank = dir.join("blank.png");
            drawing.save(&catalog).unwrap();
            drawing.save(&order).unwrap();
            GrayImage::from_pixel(100, 100, Luma([255u8])).save(&blank).unwrap();

            Self {
                dir,
                catalog,
                order,
                blank,
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn letters() -> Vec<LetterSpec> {
        vec![
            LetterSpec::rib("A"),
            LetterSpec::right_angle("B"),
            LetterSpec::rib("C"),
            LetterSpec::angle("D"),
        ]
    }

    fn mapper(provider: Arc<MockVisionProvider>, policy: ViolationPolicy) -> RibMapper {
        RibMapper::new(
            provider,
            MapperSettings {
                policy,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn maps_every_letter_and_pins_right_angles() {
        let fx = Fixture::new("happy");
        let provider = Arc::new(MockVisionProvider::new("mock").with_response(
            r#"{"mappings": [
                {"letter": "A", "value": 250, "confidence": 0.95},
                {"letter": "B", "value": 87, "confidence": 0.6},
                {"letter": "C", "value": 120, "confidence": 0.9},
                {"letter": "D", "value": 135, "confidence": 0.8}
            ]}"#,
        ));
        let result = mapper(provider.clone(), ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();

        assert!(result.is_ok());
        assert_eq!(result.mappings.len(), 4);
        assert_eq!(result.mappings["A"].value, Some(250.0));
        assert_eq!(result.mappings["B"].value, Some(RIGHT_ANGLE_DEGREES));
        assert_eq!(result.mappings["D"].value, Some(135.0));
        assert!(!result.has_violations());
        assert_eq!(
            result.issues,
            vec![ContractIssue::RightAngleOverridden {
                letter: "B".into(),
                reported: Some(87.0)
            }]
        );

        let request = provider.last_request().unwrap();
        assert_eq!(request.images.len(), 2);
        assert_eq!(request.images[0].label, "catalog");
        assert!(request.user_prompt.contains("- B: angle, FIXED 90"));
    }

    #[tokio::test]
    async fn incomplete_response_is_reported_not_truncated() {
        let fx = Fixture::new("report");
        let provider = Arc::new(MockVisionProvider::new("mock").with_response(
            "Sure! ```json\n{\"A\": 250, \"A \": 260, \"X\": 1}\n```",
        ));
        let result = mapper(provider, ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();

        assert_eq!(result.mappings.len(), 4);
        assert_eq!(result.mappings["A"].value, Some(250.0));
        assert_eq!(result.mappings["B"].value, Some(RIGHT_ANGLE_DEGREES));
        assert_eq!(result.mappings["C"], LetterMapping::not_found());
        assert!(result.has_violations());
        assert!(result.issues.contains(&ContractIssue::Duplicate { letter: "A".into() }));
        assert!(result.issues.contains(&ContractIssue::Unknown { letter: "X".into() }));
        assert!(result.issues.contains(&ContractIssue::Missing { letter: "D".into() }));
    }

    #[tokio::test]
    async fn reject_policy_fails_on_violation() {
        let fx = Fixture::new("reject");
        let provider = Arc::new(MockVisionProvider::new("mock").with_response(r#"{"A": 250}"#));
        let err = mapper(provider, ViolationPolicy::Reject)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap_err();
        assert!(matches!(err, BendlineError::ContractViolation(_)));
        assert!(err.to_string().contains("letter 'C' missing"));
    }

    #[tokio::test]
    async fn provider_error_yields_empty_error_object_without_retry() {
        let fx = Fixture::new("network");
        let provider = Arc::new(
            MockVisionProvider::new("mock")
                .then_fail("connection reset")
                .with_response(r#"{"A": 1}"#),
        );
        let result = mapper(provider.clone(), ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();

        assert!(result.mappings.is_empty());
        assert!(result.error.unwrap().contains("connection reset"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn rerun_after_provider_error_maps_normally() {
        let fx = Fixture::new("rerun");
        let provider = Arc::new(
            MockVisionProvider::new("mock")
                .then_fail("timeout")
                .then_reply(r#"{"A": 250, "B": 90, "C": 120, "D": 135}"#),
        );
        let m = mapper(provider.clone(), ViolationPolicy::Reject);

        let first = m
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();
        assert!(first.error.is_some());

        let second = m
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();
        assert!(second.is_ok());
        assert_eq!(second.mappings["C"].value, Some(120.0));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn provider_error_text_is_scrubbed_of_keys() {
        let fx = Fixture::new("scrub");
        let provider = Arc::new(MockVisionProvider::new("mock").then_fail(
            "error sending request for url (http://127.0.0.1:1/models/x:generateContent?key=AIzaSyTOPSECRETkey1234567890abc)",
        ));
        let result = mapper(provider, ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap();

        let error = result.error.unwrap();
        assert!(!error.contains("TOPSECRET"));
        assert!(error.contains("[REDACTED_TOKEN]"));
    }

    #[tokio::test]
    async fn tiff_order_crop_is_uploaded_as_png() {
        let fx = Fixture::new("tiff");
        let tiff = fx.dir.join("order_line.tif");
        image::open(&fx.order).unwrap().save(&tiff).unwrap();
        let provider = Arc::new(MockVisionProvider::new("mock").with_response(r#"{"A": 250}"#));
        mapper(provider.clone(), ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &tiff, &letters())
            .await
            .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.images[1].mime_type, "image/png");
    }

    #[tokio::test]
    async fn unparseable_output_is_hard_failure() {
        let fx = Fixture::new("garbage");
        let provider = Arc::new(MockVisionProvider::new("mock").with_response("no idea, sorry"));
        let err = mapper(provider, ViolationPolicy::Report)
            .map_catalog_to_order("104", &fx.catalog, &fx.order, &letters())
            .await
            .unwrap_err();
        assert!(matches!(err, BendlineError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn preconditions_are_checked_before_calling_the_model() {
        let fx = Fixture::new("pre");
        let provider = Arc::new(MockVisionProvider::new("mock").with_response("{}"));
        let m = mapper(provider.clone(), ViolationPolicy::Report);

        let dup = vec![LetterSpec::rib("A"), LetterSpec::rib("A")];
        assert!(matches!(
            m.map_catalog_to_order("104", &fx.catalog, &fx.order, &dup).await,
            Err(BendlineError::InvalidLetterList(_))
        ));
        assert!(matches!(
            m.map_catalog_to_order("104", &fx.catalog, &fx.order, &[]).await,
            Err(BendlineError::InvalidLetterList(_))
        ));
        let missing = fx.dir.join("nope.png");
        assert!(matches!(
            m.map_catalog_to_order("104", &missing, &fx.order, &letters()).await,
            Err(BendlineError::ImageUnreadable { .. })
        ));
        assert!(matches!(
            m.map_catalog_to_order("104", &fx.catalog, &fx.blank, &letters()).await,
            Err(BendlineError::NoDrawing(_))
        ));
        assert_eq!(provider.call_count(), 0);
    }
}
