//! Model output contract.
//!
//! The model is asked for `{"mappings": [{"letter", "value", "confidence"}]}`.
//! What comes back is parsed leniently (bare JSON, a fenced block, or the
//! outermost braces found in prose), then checked strictly against the
//! requested letters: exactly one entry per letter, nothing extra.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use bendline_core::{
    BendlineError, ContractIssue, LetterMapping, LetterSpec, RIGHT_ANGLE_DEGREES,
};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").unwrap());

static OUTER_BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Group 1: thousands-grouped (`1,200`, `12,000.5`). Group 2: plain or
/// decimal comma (`120`, `12,5`).
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(-?\d{1,3}(?:,\d{3})+(?:\.\d+)?)(?:[^\d.,]|$)|(-?\d+(?:[.,]\d+)?))")
        .unwrap()
});

/// Confidence assumed when the model gives a value without one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// One letter as reported by the model, before contract checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub letter: String,
    pub value: Option<f64>,
    pub confidence: Option<f64>,
    /// Why the reported value could not be used.
    pub invalid: Option<String>,
}

/// Mappings after contract checks, one per requested letter.
#[derive(Debug, Clone, Default)]
pub struct ContractReport {
    pub mappings: BTreeMap<String, LetterMapping>,
    pub issues: Vec<ContractIssue>,
}

/// Extract the JSON document from raw model text.
pub fn parse_model_output(text: &str) -> Result<Value, BendlineError> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }
    if let Some(v) = FENCED_JSON
        .captures(trimmed)
        .and_then(|c| serde_json::from_str::<Value>(&c[1]).ok())
    {
        return Ok(v);
    }
    if let Some(v) = OUTER_BRACES
        .find(trimmed)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
    {
        return Ok(v);
    }
    let preview: String = trimmed.chars().take(120).collect();
    Err(BendlineError::MalformedResponse(format!(
        "no JSON object found in model output: {preview:?}"
    )))
}

/// Read letter entries from either accepted shape:
/// `{"mappings": [{"letter": "A", ...}]}` or `{"A": {"value": ...}, "B": 90}`
/// (the keyed form may also sit under `"mappings"`).
pub fn extract_entries(doc: &Value) -> Result<Vec<ModelEntry>, BendlineError> {
    let body = doc.get("mappings").unwrap_or(doc);
    match body {
        Value::Array(items) => items.iter().map(entry_from_item).collect(),
        Value::Object(map) => Ok(map
            .iter()
            .map(|(letter, v)| entry_from_keyed(letter, v))
            .collect()),
        other => Err(BendlineError::MalformedResponse(format!(
            "expected mappings array or object, got {}",
            kind_of(other)
        ))),
    }
}

fn entry_from_item(item: &Value) -> Result<ModelEntry, BendlineError> {
    let letter = item
        .get("letter")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            BendlineError::MalformedResponse(format!("mapping entry without letter: {item}"))
        })?;
    Ok(entry_from_keyed(letter, item))
}

fn entry_from_keyed(letter: &str, v: &Value) -> ModelEntry {
    let (raw_value, confidence) = match v {
        Value::Object(fields) => (
            fields.get("value").unwrap_or(&Value::Null),
            fields.get("confidence").and_then(read_number),
        ),
        scalar => (scalar, None),
    };
    let (value, invalid) = match read_value(raw_value) {
        Ok(value) => (value, None),
        Err(detail) => (None, Some(detail)),
    };
    ModelEntry {
        letter: letter.trim().to_string(),
        value,
        confidence,
        invalid,
    }
}

/// Numbers pass through; strings like `"120 mm"` or `"90°"` keep their
/// leading number; null means not found.
fn read_value(v: &Value) -> Result<Option<f64>, String> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| format!("{n} is not a float")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => read_number(v)
            .map(Some)
            .ok_or_else(|| format!("{s:?} is not a number")),
        other => Err(format!("{} is not a number", kind_of(other))),
    }
}

fn read_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let caps = LEADING_NUMBER.captures(s)?;
            match caps.get(1) {
                Some(grouped) => grouped.as_str().replace(',', "").parse().ok(),
                None => caps.get(2)?.as_str().replace(',', ".").parse().ok(),
            }
        }
        _ => None,
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check model entries against the requested letters.
///
/// Every requested letter ends up with exactly one mapping. Letters the model
/// skipped, repeated, invented or filled with garbage are listed as issues;
/// unusable values become `not_found`. Letter matching falls back to
/// case-insensitive when there is no exact match.
pub fn validate_contract(entries: Vec<ModelEntry>, letters: &[LetterSpec]) -> ContractReport {
    let requested: HashMap<String, &str> = letters
        .iter()
        .map(|l| (l.letter.to_uppercase(), l.letter.as_str()))
        .collect();

    let mut report = ContractReport::default();
    for entry in entries {
        let canonical = letters
            .iter()
            .find(|l| l.letter == entry.letter)
            .map(|l| l.letter.as_str())
            .or_else(|| requested.get(&entry.letter.to_uppercase()).copied());
        let Some(letter) = canonical else {
            report.issues.push(ContractIssue::Unknown {
                letter: entry.letter,
            });
            continue;
        };
        if report.mappings.contains_key(letter) {
            report.issues.push(ContractIssue::Duplicate {
                letter: letter.to_string(),
            });
            continue;
        }
        let mapping = match (entry.invalid, entry.value) {
            (Some(detail), _) => {
                report.issues.push(ContractIssue::InvalidValue {
                    letter: letter.to_string(),
                    detail,
                });
                LetterMapping::not_found()
            }
            (None, Some(v)) if !v.is_finite() || v < 0.0 => {
                report.issues.push(ContractIssue::InvalidValue {
                    letter: letter.to_string(),
                    detail: format!("{v} is out of range"),
                });
                LetterMapping::not_found()
            }
            (None, None) => LetterMapping::not_found(),
            (None, Some(v)) => LetterMapping {
                value: Some(v),
                confidence: entry
                    .confidence
                    .unwrap_or(DEFAULT_CONFIDENCE)
                    .clamp(0.0, 1.0),
            },
        };
        report.mappings.insert(letter.to_string(), mapping);
    }

    for spec in letters {
        if !report.mappings.contains_key(&spec.letter) {
            report.issues.push(ContractIssue::Missing {
                letter: spec.letter.clone(),
            });
            report
                .mappings
                .insert(spec.letter.clone(), LetterMapping::not_found());
        }
    }
    report
}

/// Pin every catalog right angle to 90, whatever the model said.
///
/// Returns one issue per letter whose reported value was not already 90.
pub fn enforce_right_angles(
    mappings: &mut BTreeMap<String, LetterMapping>,
    letters: &[LetterSpec],
) -> Vec<ContractIssue> {
    let mut issues = Vec::new();
    for spec in letters.iter().filter(|l| l.is_fixed_right_angle()) {
        let reported = mappings.get(&spec.letter).and_then(|m| m.value);
        if reported != Some(RIGHT_ANGLE_DEGREES) {
            issues.push(ContractIssue::RightAngleOverridden {
                letter: spec.letter.clone(),
                reported,
            });
        }
        mappings.insert(spec.letter.clone(), LetterMapping::right_angle());
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn letters() -> Vec<LetterSpec> {
        vec![
            LetterSpec::rib("A"),
            LetterSpec::right_angle("B"),
            LetterSpec::rib("C"),
        ]
    }

    fn entry(letter: &str, value: Option<f64>, confidence: Option<f64>) -> ModelEntry {
        ModelEntry {
            letter: letter.into(),
            value,
            confidence,
            invalid: None,
        }
    }

    #[test]
    fn parses_bare_json() {
        let v = parse_model_output(r#"{"mappings": []}"#).unwrap();
        assert!(v["mappings"].is_array());
    }

    #[test]
    fn parses_fenced_block() {
        let text = "Here you go:\n```json\n{\"mappings\": [{\"letter\": \"A\", \"value\": 120}]}\n```\nDone.";
        let v = parse_model_output(text).unwrap();
        assert_eq!(v["mappings"][0]["value"], 120);
    }

    #[test]
    fn falls_back_to_outer_braces() {
        let text = "The values are {\"A\": 250, \"C\": 40} as drawn.";
        let v = parse_model_output(text).unwrap();
        assert_eq!(v["A"], 250);
    }

    #[test]
    fn unparseable_output_is_malformed() {
        let err = parse_model_output("I cannot read this drawing.").unwrap_err();
        assert!(matches!(err, BendlineError::MalformedResponse(_)));
        let err = parse_model_output("{A: 250,").unwrap_err();
        assert!(matches!(err, BendlineError::MalformedResponse(_)));
    }

    #[test]
    fn extracts_array_and_keyed_forms() {
        let array = json!({"mappings": [
            {"letter": "A", "value": 120, "confidence": 0.9},
            {"letter": "C", "value": "45 mm"}
        ]});
        let entries = extract_entries(&array).unwrap();
        assert_eq!(entries[0], entry("A", Some(120.0), Some(0.9)));
        assert_eq!(entries[1], entry("C", Some(45.0), None));

        let keyed = json!({"A": {"value": 120, "confidence": 0.8}, "B": "90°", "C": null});
        let entries = extract_entries(&keyed).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().any(|e| e.letter == "B" && e.value == Some(90.0)));
        assert!(entries.iter().any(|e| e.letter == "C" && e.value.is_none()));
    }

    #[test]
    fn comma_reads_as_thousands_only_before_three_digits() {
        let doc = json!({
            "A": "1,200 mm",
            "B": "12,5",
            "C": "12,000.5",
            "D": "1,2000",
            "E": "1,200mm"
        });
        let entries = extract_entries(&doc).unwrap();
        let value = |letter: &str| entries.iter().find(|e| e.letter == letter).unwrap().value;
        assert_eq!(value("A"), Some(1200.0));
        assert_eq!(value("B"), Some(12.5));
        assert_eq!(value("C"), Some(12000.5));
        assert_eq!(value("D"), Some(1.2));
        assert_eq!(value("E"), Some(1200.0));
    }

    #[test]
    fn entry_without_letter_is_malformed() {
        let doc = json!({"mappings": [{"value": 3}]});
        assert!(extract_entries(&doc).is_err());
    }

    #[test]
    fn non_numeric_value_is_flagged() {
        let doc = json!({"mappings": [{"letter": "A", "value": "long"}]});
        let entries = extract_entries(&doc).unwrap();
        assert!(entries[0].invalid.is_some());
    }

    #[test]
    fn every_letter_gets_exactly_one_mapping() {
        let entries = vec![
            entry("A", Some(120.0), Some(0.9)),
            entry("A", Some(999.0), Some(0.9)),
            entry("Z", Some(5.0), Some(0.5)),
        ];
        let report = validate_contract(entries, &letters());

        assert_eq!(report.mappings.len(), 3);
        assert_eq!(report.mappings["A"].value, Some(120.0));
        assert_eq!(report.mappings["C"], LetterMapping::not_found());
        assert!(report.issues.contains(&ContractIssue::Duplicate { letter: "A".into() }));
        assert!(report.issues.contains(&ContractIssue::Unknown { letter: "Z".into() }));
        assert!(report.issues.contains(&ContractIssue::Missing { letter: "B".into() }));
        assert!(report.issues.contains(&ContractIssue::Missing { letter: "C".into() }));
    }

    #[test]
    fn lowercase_letters_match_requested() {
        let report = validate_contract(vec![entry("a", Some(10.0), None)], &[LetterSpec::rib("A")]);
        assert!(report.issues.is_empty());
        assert_eq!(report.mappings["A"].value, Some(10.0));
        assert_eq!(report.mappings["A"].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn null_value_has_zero_confidence() {
        let report = validate_contract(vec![entry("A", None, Some(0.7))], &[LetterSpec::rib("A")]);
        assert_eq!(report.mappings["A"], LetterMapping::not_found());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn negative_values_are_rejected() {
        let report =
            validate_contract(vec![entry("A", Some(-4.0), Some(0.9))], &[LetterSpec::rib("A")]);
        assert_eq!(report.mappings["A"], LetterMapping::not_found());
        assert!(matches!(report.issues[0], ContractIssue::InvalidValue { .. }));
    }

    #[test]
    fn confidence_is_clamped() {
        let report = validate_contract(vec![entry("A", Some(1.0), Some(7.0))], &[LetterSpec::rib("A")]);
        assert_eq!(report.mappings["A"].confidence, 1.0);
    }

    #[test]
    fn right_angles_are_forced_to_ninety() {
        let letters = letters();
        for reported in [Some(88.0), Some(270.0), None, Some(90.0)] {
            let report = validate_contract(
                vec![entry("A", Some(300.0), None), entry("B", reported, Some(0.4))],
                &letters,
            );
            let mut mappings = report.mappings;
            let issues = enforce_right_angles(&mut mappings, &letters);

            assert_eq!(mappings["B"].value, Some(RIGHT_ANGLE_DEGREES));
            assert_eq!(mappings["A"].value, Some(300.0));
            assert_eq!(issues.is_empty(), reported == Some(90.0));
        }
    }
}
