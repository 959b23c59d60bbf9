use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bendline_catalog::CatalogShape;
use bendline_core::{ContractIssue, MappingResult, RIGHT_ANGLE_DEGREES};

use crate::keys::{LineKey, PageKey};

/// One order line: a catalog shape and the value read for each of its letters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub shape: String,
    /// Millimeters for ribs, degrees for angles. `null` until read.
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
    /// Set once an operator has edited the line.
    #[serde(default)]
    pub reviewed: bool,
    /// Contract issues from the last mapping, kept for the reviewer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ContractIssue>,
    /// Model readings that disagree with a reviewed line. The reviewed
    /// values stay; these wait for the operator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conflicts: BTreeMap<String, f64>,
}

impl OrderLine {
    /// Empty line for `shape`, with catalog right angles already at 90.
    pub fn for_shape(shape: &CatalogShape) -> Self {
        let mut line = OrderLine {
            shape: shape.number.clone(),
            ..Default::default()
        };
        for spec in &shape.ribs {
            if spec.is_fixed_right_angle() {
                line.values.insert(spec.letter.clone(), Some(RIGHT_ANGLE_DEGREES));
                line.confidence.insert(spec.letter.clone(), 1.0);
            } else {
                line.values.insert(spec.letter.clone(), None);
            }
        }
        line
    }

    /// Fold a mapping result into the line, keyed by letter.
    ///
    /// A `null` from the model never overwrites a value already on the line,
    /// so merging the same result twice leaves the line unchanged. Once the
    /// line is reviewed its values are left alone and differing readings go
    /// to `conflicts`. Returns the letters that conflicted.
    pub fn merge(&mut self, result: &MappingResult) -> Vec<String> {
        let mut conflicted = Vec::new();
        for (letter, mapping) in &result.mappings {
            match mapping.value {
                Some(v) if self.reviewed => {
                    if self.values.get(letter).copied().flatten() != Some(v) {
                        self.conflicts.insert(letter.clone(), v);
                        conflicted.push(letter.clone());
                    }
                }
                Some(v) => {
                    self.values.insert(letter.clone(), Some(v));
                    self.confidence.insert(letter.clone(), mapping.confidence);
                }
                None => {
                    self.values.entry(letter.clone()).or_insert(None);
                }
            }
        }
        self.issues = result.issues.clone();
        conflicted
    }

    /// Operator value for `letter`. Marks the line reviewed and settles any
    /// conflict on that letter.
    pub fn set_reviewed(&mut self, letter: &str, value: Option<f64>) {
        self.values.insert(letter.to_string(), value);
        match value {
            Some(_) => self.confidence.insert(letter.to_string(), 1.0),
            None => self.confidence.remove(letter),
        };
        self.conflicts.remove(letter);
        self.reviewed = true;
    }

    /// Letters still without a value.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.as_str())
    }
}

/// Everything extracted for one customer order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default)]
    pub pages: BTreeMap<PageKey, BTreeMap<LineKey, OrderLine>>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            customer: None,
            pages: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn line(&self, page: u32, line: u32) -> Option<&OrderLine> {
        self.pages.get(&PageKey(page))?.get(&LineKey(line))
    }

    pub fn line_mut(&mut self, page: u32, line: u32) -> Option<&mut OrderLine> {
        self.pages.get_mut(&PageKey(page))?.get_mut(&LineKey(line))
    }

    /// The line at `page`/`line`, created for `shape` if absent or if it
    /// currently holds a different shape.
    pub fn line_for_shape(&mut self, page: u32, line: u32, shape: &CatalogShape) -> &mut OrderLine {
        let slot = self
            .pages
            .entry(PageKey(page))
            .or_default()
            .entry(LineKey(line))
            .or_insert_with(|| OrderLine::for_shape(shape));
        if slot.shape != shape.number {
            *slot = OrderLine::for_shape(shape);
        }
        slot
    }

    pub fn line_count(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
