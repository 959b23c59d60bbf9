//! Shape crop pre-filter.
//!
//! Before an order crop is sent to the vision model we make sure it holds a
//! drawing: Canny edges must yield enough straight strokes under a Hough
//! transform, and the ink mask must contain at least one sizeable outer
//! contour. Empty cells and cells with only handwriting fail cheaply here.

use image::DynamicImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use serde::Serialize;
use tracing::debug;

use crate::raster::ink_mask;

#[derive(Debug, Clone, Copy)]
pub struct ShapeCheckOptions {
    pub ink_threshold: u8,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Hough votes a stroke needs.
    pub stroke_votes: u32,
    pub min_lines: usize,
    pub min_contours: usize,
    /// Contours with fewer boundary points are specks.
    pub min_contour_points: usize,
}

impl Default for ShapeCheckOptions {
    fn default() -> Self {
        Self {
            ink_threshold: 128,
            canny_low: 50.0,
            canny_high: 100.0,
            stroke_votes: 40,
            min_lines: 2,
            min_contours: 1,
            min_contour_points: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ShapeCheck {
    pub line_count: usize,
    pub contour_count: usize,
    /// Share of pixels that are ink.
    pub ink_ratio: f32,
    pub has_drawing: bool,
}

/// Decide whether a crop contains a drawn shape.
pub fn check_shape_crop(image: &DynamicImage, options: &ShapeCheckOptions) -> ShapeCheck {
    let gray = image.to_luma8();
    let pixels = (gray.width() as usize * gray.height() as usize).max(1);

    let edges = canny(&gray, options.canny_low, options.canny_high);
    let line_count = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: options.stroke_votes,
            suppression_radius: 8,
        },
    )
    .len();

    let mask = ink_mask(&gray, options.ink_threshold);
    let ink = mask.pixels().filter(|p| p[0] > 0).count();
    let contour_count = find_contours::<u32>(&mask)
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter(|c| c.points.len() >= options.min_contour_points)
        .count();

    let check = ShapeCheck {
        line_count,
        contour_count,
        ink_ratio: ink as f32 / pixels as f32,
        has_drawing: line_count >= options.min_lines && contour_count >= options.min_contours,
    };
    debug!(
        lines = check.line_count,
        contours = check.contour_count,
        ink_ratio = check.ink_ratio,
        has_drawing = check.has_drawing,
        "Checked shape crop"
    );
    check
}
