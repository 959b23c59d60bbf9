//! Prompt text for catalog-to-order letter mapping.

use std::fmt::Write;

use bendline_core::{LetterSpec, RibKind};

pub const MAPPING_SYSTEM_PROMPT: &str = r#"You read technical drawings of bent reinforcing iron.

You receive two images, in this order:
1. CATALOG: the reference drawing of a catalog shape. Every rib (straight
   segment) and angle (corner) is labelled with a letter.
2. ORDER: the customer's drawing of the same shape, annotated with numbers.

For each requested letter, find the matching segment or corner in the ORDER
drawing and read the number written closest to it.
- Ribs are lengths in millimeters.
- Angles are in degrees.
- If a letter is marked FIXED 90, answer 90 for it without reading the drawing.
- If you cannot find a number for a letter, answer null with confidence 0.
- Report every requested letter exactly once. Do not add other letters.

Answer with JSON only, no prose:
{"mappings": [{"letter": "A", "value": 250, "confidence": 0.9}]}
confidence is between 0 and 1."#;

/// User prompt listing the letters to map for one shape.
pub fn build_mapping_prompt(shape_number: &str, letters: &[LetterSpec]) -> String {
    let mut prompt = format!("Catalog shape {shape_number}. Requested letters:\n");
    for spec in letters {
        let _ = match (spec.kind, spec.is_90) {
            (RibKind::Angle, true) => writeln!(prompt, "- {}: angle, FIXED 90", spec.letter),
            (RibKind::Angle, false) => writeln!(prompt, "- {}: angle (degrees)", spec.letter),
            (RibKind::Rib, _) => writeln!(prompt, "- {}: rib (mm)", spec.letter),
        };
    }
    let _ = write!(
        prompt,
        "Return exactly {} entries, one per letter above.",
        letters.len()
    );
    prompt
}
