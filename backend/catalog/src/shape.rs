use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use bendline_core::{validate_letter_list, BendlineError, ClockDirection, LetterSpec, RibKind};

/// One catalog template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogShape {
    /// Filled from the catalog key on load.
    #[serde(skip)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub clock_direction: ClockDirection,
    /// Reference drawing, relative to the catalog images directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Ribs and angles in drawing order.
    pub ribs: Vec<LetterSpec>,
}

impl CatalogShape {
    /// The letter list handed to the rib mapper.
    pub fn letter_list(&self) -> Vec<LetterSpec> {
        self.ribs.clone()
    }

    pub fn rib_count(&self) -> usize {
        self.ribs.iter().filter(|r| r.kind == RibKind::Rib).count()
    }

    pub fn angle_count(&self) -> usize {
        self.ribs.iter().filter(|r| r.kind == RibKind::Angle).count()
    }

    /// Letters pinned to 90 degrees by the catalog.
    pub fn right_angles(&self) -> impl Iterator<Item = &str> {
        self.ribs
            .iter()
            .filter(|r| r.is_fixed_right_angle())
            .map(|r| r.letter.as_str())
    }
}

/// All catalog shapes, keyed by catalog number.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    shapes: BTreeMap<String, CatalogShape>,
}

impl Catalog {
    /// Read and validate the catalog JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("Invalid catalog: {}", path.display()))?;
        info!(path = %path.display(), shapes = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    /// Parse a catalog document. Every shape must carry a valid letter list.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut shapes: BTreeMap<String, CatalogShape> =
            serde_json::from_str(raw).context("Catalog is not a JSON object of shapes")?;
        for (number, shape) in shapes.iter_mut() {
            shape.number = number.clone();
            for spec in &mut shape.ribs {
                spec.letter = spec.letter.trim().to_string();
            }
            validate_letter_list(&shape.ribs)
                .with_context(|| format!("Catalog shape {number}"))?;
        }
        Ok(Self { shapes })
    }

    pub fn get(&self, number: &str) -> Result<&CatalogShape, BendlineError> {
        self.shapes
            .get(number.trim())
            .ok_or_else(|| BendlineError::UnknownShape(number.to_string()))
    }

    /// Catalog numbers in sorted order.
    pub fn numbers(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Locate the reference drawing for a shape: its `image` field if set,
/// otherwise `shape_{number}.png`.
pub fn catalog_image_path(images_dir: &Path, shape: &CatalogShape) -> PathBuf {
    match &shape.image {
        Some(image) => images_dir.join(image),
        None => images_dir.join(format!("shape_{}.png", shape.number)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "000": {
            "description": "straight bar",
            "ribs": [{"letter": "A", "type": "rib"}]
        },
        "104": {
            "clockDirection": "counterclockwise",
            "image": "u_hook.png",
            "ribs": [
                {"letter": "A", "type": "rib"},
                {"letter": "B", "type": "angle", "is90": true},
                {"letter": "C", "type": "rib"},
                {"letter": "D", "type": "angle"},
                {"letter": "E", "type": "rib"}
            ]
        }
    }"#;

    #[test]
    fn loads_shapes_with_numbers() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.numbers().collect::<Vec<_>>(), vec!["000", "104"]);

        let hook = catalog.get("104").unwrap();
        assert_eq!(hook.number, "104");
        assert_eq!(hook.clock_direction, ClockDirection::Counterclockwise);
        assert_eq!(hook.rib_count(), 3);
        assert_eq!(hook.angle_count(), 2);
        assert_eq!(hook.right_angles().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn unknown_shape_is_typed_error() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert!(matches!(
            catalog.get("999"),
            Err(BendlineError::UnknownShape(n)) if n == "999"
        ));
    }

    #[test]
    fn rejects_shape_with_duplicate_letters() {
        let raw = r#"{"7": {"ribs": [{"letter": "A", "type": "rib"}, {"letter": "A", "type": "angle"}]}}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(format!("{err:#}").contains("Catalog shape 7"));
    }

    #[test]
    fn letters_are_trimmed_on_load() {
        let raw = r#"{"7": {"ribs": [{"letter": " A ", "type": "rib"}, {"letter": "B", "type": "angle", "is90": true}]}}"#;
        let catalog = Catalog::from_json(raw).unwrap();
        let letters = catalog.get("7").unwrap().letter_list();
        assert_eq!(letters[0].letter, "A");
        assert!(validate_letter_list(&letters).is_ok());

        let raw = r#"{"8": {"ribs": [{"letter": "A ", "type": "rib"}, {"letter": "A", "type": "angle"}]}}"#;
        assert!(Catalog::from_json(raw).is_err());
    }

    #[test]
    fn image_path_prefers_explicit_file() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let dir = Path::new("/srv/catalog");
        assert_eq!(
            catalog_image_path(dir, catalog.get("104").unwrap()),
            dir.join("u_hook.png")
        );
        assert_eq!(
            catalog_image_path(dir, catalog.get("000").unwrap()),
            dir.join("shape_000.png")
        );
    }
}
