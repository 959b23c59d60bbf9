use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BendlineError;

/// Value every right-angle letter is pinned to.
pub const RIGHT_ANGLE_DEGREES: f64 = 90.0;

/// Whether a catalog letter names a straight segment or a corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RibKind {
    /// Straight segment, measured in millimeters.
    Rib,
    /// Corner between two ribs, measured in degrees.
    Angle,
}

impl fmt::Display for RibKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RibKind::Rib => write!(f, "rib"),
            RibKind::Angle => write!(f, "angle"),
        }
    }
}

/// Drawing direction of a catalog shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockDirection {
    #[default]
    Clockwise,
    #[serde(alias = "counter_clockwise", alias = "anticlockwise")]
    Counterclockwise,
}

/// One entry of a catalog shape's rib list, and one input to the mapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LetterSpec {
    pub letter: String,
    #[serde(rename = "type")]
    pub kind: RibKind,
    /// Fixed by the catalog, never detected.
    #[serde(default, rename = "is90", alias = "is_90", skip_serializing_if = "is_false")]
    pub is_90: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl LetterSpec {
    pub fn rib(letter: impl Into<String>) -> Self {
        Self {
            letter: letter.into(),
            kind: RibKind::Rib,
            is_90: false,
        }
    }

    pub fn angle(letter: impl Into<String>) -> Self {
        Self {
            letter: letter.into(),
            kind: RibKind::Angle,
            is_90: false,
        }
    }

    pub fn right_angle(letter: impl Into<String>) -> Self {
        Self {
            letter: letter.into(),
            kind: RibKind::Angle,
            is_90: true,
        }
    }

    /// True for angles the catalog pins to 90 degrees.
    pub fn is_fixed_right_angle(&self) -> bool {
        self.kind == RibKind::Angle && self.is_90
    }
}

/// Check a letter list before it is handed to the model or stored.
///
/// Letters must be non-empty, free of surrounding whitespace, and unique,
/// and only angles may carry `is_90`.
pub fn validate_letter_list(letters: &[LetterSpec]) -> Result<(), BendlineError> {
    let mut seen = HashSet::new();
    for spec in letters {
        let letter = spec.letter.trim();
        if letter.is_empty() {
            return Err(BendlineError::InvalidLetterList(
                "letter cannot be empty".to_string(),
            ));
        }
        if letter != spec.letter {
            return Err(BendlineError::InvalidLetterList(format!(
                "letter {:?} has surrounding whitespace",
                spec.letter
            )));
        }
        if !seen.insert(letter) {
            return Err(BendlineError::InvalidLetterList(format!(
                "duplicate letter '{letter}'"
            )));
        }
        if spec.is_90 && spec.kind != RibKind::Angle {
            return Err(BendlineError::InvalidLetterList(format!(
                "letter '{letter}' is a rib but is flagged is90"
            )));
        }
    }
    Ok(())
}

/// The value read for one letter, with the model's confidence in it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LetterMapping {
    pub value: Option<f64>,
    pub confidence: f64,
}

impl LetterMapping {
    /// A letter the model could not locate.
    pub fn not_found() -> Self {
        Self {
            value: None,
            confidence: 0.0,
        }
    }

    pub fn right_angle() -> Self {
        Self {
            value: Some(RIGHT_ANGLE_DEGREES),
            confidence: 1.0,
        }
    }
}

/// A disagreement between the model response and the requested letters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractIssue {
    /// Requested letter absent from the response.
    Missing { letter: String },
    /// Letter reported more than once; the first entry is kept.
    Duplicate { letter: String },
    /// Letter in the response that was never requested.
    Unknown { letter: String },
    /// Value that is not a finite, non-negative number.
    InvalidValue { letter: String, detail: String },
    /// Right-angle letter the model reported as something other than 90.
    RightAngleOverridden { letter: String, reported: Option<f64> },
}

impl ContractIssue {
    pub fn letter(&self) -> &str {
        match self {
            ContractIssue::Missing { letter }
            | ContractIssue::Duplicate { letter }
            | ContractIssue::Unknown { letter }
            | ContractIssue::InvalidValue { letter, .. }
            | ContractIssue::RightAngleOverridden { letter, .. } => letter,
        }
    }

    /// Whether the issue means the response broke the one-entry-per-letter rule.
    pub fn is_violation(&self) -> bool {
        !matches!(self, ContractIssue::RightAngleOverridden { .. })
    }
}

impl fmt::Display for ContractIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractIssue::Missing { letter } => write!(f, "letter '{letter}' missing"),
            ContractIssue::Duplicate { letter } => write!(f, "letter '{letter}' duplicated"),
            ContractIssue::Unknown { letter } => write!(f, "letter '{letter}' not requested"),
            ContractIssue::InvalidValue { letter, detail } => {
                write!(f, "letter '{letter}' has invalid value: {detail}")
            }
            ContractIssue::RightAngleOverridden { letter, reported } => match reported {
                Some(v) => write!(f, "letter '{letter}' forced to 90 (model said {v})"),
                None => write!(f, "letter '{letter}' forced to 90 (model gave no value)"),
            },
        }
    }
}

/// Outcome of one catalog-to-order mapping call.
///
/// `mappings` always has exactly one entry per requested letter, unless
/// `error` is set, in which case it is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MappingResult {
    pub mappings: BTreeMap<String, LetterMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ContractIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MappingResult {
    /// The error object returned when the provider could not be reached.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            mappings: BTreeMap::new(),
            issues: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn has_violations(&self) -> bool {
        self.issues.iter().any(ContractIssue::is_violation)
    }

    /// Letter to value view, dropping confidences.
    pub fn values(&self) -> BTreeMap<String, Option<f64>> {
        self.mappings
            .iter()
            .map(|(letter, m)| (letter.clone(), m.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_spec_reads_catalog_json() {
        let spec: LetterSpec =
            serde_json::from_str(r#"{"letter":"B","type":"angle","is90":true}"#).unwrap();
        assert!(spec.is_fixed_right_angle());

        let legacy: LetterSpec =
            serde_json::from_str(r#"{"letter":"B","type":"angle","is_90":true}"#).unwrap();
        assert_eq!(spec, legacy);

        let rib: LetterSpec = serde_json::from_str(r#"{"letter":"A","type":"rib"}"#).unwrap();
        assert!(!rib.is_90);
    }

    #[test]
    fn rejects_duplicate_letters() {
        let letters = vec![LetterSpec::rib("A"), LetterSpec::angle("A")];
        let err = validate_letter_list(&letters).unwrap_err();
        assert!(err.to_string().contains("duplicate letter 'A'"));
    }

    #[test]
    fn rejects_padded_letters() {
        let err = validate_letter_list(&[LetterSpec::rib("A ")]).unwrap_err();
        assert!(err.to_string().contains("surrounding whitespace"));
    }

    #[test]
    fn rejects_right_angle_flag_on_rib() {
        let mut rib = LetterSpec::rib("C");
        rib.is_90 = true;
        assert!(validate_letter_list(&[rib]).is_err());
    }

    #[test]
    fn accepts_well_formed_list() {
        let letters = vec![
            LetterSpec::rib("A"),
            LetterSpec::right_angle("B"),
            LetterSpec::rib("C"),
        ];
        assert!(validate_letter_list(&letters).is_ok());
    }

    #[test]
    fn failed_result_has_no_mappings() {
        let result = MappingResult::failed("timeout");
        assert!(!result.is_ok());
        assert!(result.mappings.is_empty());
    }

    #[test]
    fn right_angle_override_is_not_a_violation() {
        let result = MappingResult {
            issues: vec![ContractIssue::RightAngleOverridden {
                letter: "B".into(),
                reported: Some(88.0),
            }],
            ..Default::default()
        };
        assert!(!result.has_violations());
    }
}
