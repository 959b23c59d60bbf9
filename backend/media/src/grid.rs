//! Table grid detection on order pages.
//!
//! Ruled order forms are found with a Hough transform over the ink mask.
//! Near-horizontal and near-vertical peaks become candidate rules, each
//! confirmed by how much of the page width (or height) it actually covers.
//! Rules closer than `merge_distance` collapse into one coordinate.

use image::{DynamicImage, GrayImage};
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use serde::Serialize;
use tracing::debug;

use crate::raster::ink_mask;

/// Tunables for grid detection.
#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
    pub ink_threshold: u8,
    /// Share of the page side a rule must cover.
    pub rule_vote_fraction: f32,
    /// Degrees a rule may deviate from axis-aligned.
    pub angle_tolerance: u32,
    /// Rules nearer than this many pixels are one rule.
    pub merge_distance: u32,
    pub min_row_height: u32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            ink_threshold: 128,
            rule_vote_fraction: 0.5,
            angle_tolerance: 2,
            merge_distance: 6,
            min_row_height: 20,
        }
    }
}

/// The strip between two adjacent rules. `index` is 1-based.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Band {
    pub index: u32,
    pub start: u32,
    pub end: u32,
}

impl Band {
    pub fn size(&self) -> u32 {
        self.end - self.start
    }
}

/// Rule positions detected on one page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableGrid {
    pub width: u32,
    pub height: u32,
    /// y coordinates of horizontal rules, ascending.
    pub horizontal: Vec<u32>,
    /// x coordinates of vertical rules, ascending.
    pub vertical: Vec<u32>,
    #[serde(skip)]
    min_band: u32,
}

impl TableGrid {
    /// Table rows, top to bottom.
    pub fn rows(&self) -> Vec<Band> {
        bands(&self.horizontal, self.min_band)
    }

    /// Table columns, left to right.
    pub fn columns(&self) -> Vec<Band> {
        bands(&self.vertical, self.min_band)
    }

    pub fn is_table(&self) -> bool {
        self.horizontal.len() >= 2 && self.vertical.len() >= 2
    }
}

fn bands(rules: &[u32], min_size: u32) -> Vec<Band> {
    rules
        .windows(2)
        .filter(|w| w[1] - w[0] >= min_size)
        .enumerate()
        .map(|(i, w)| Band {
            index: i as u32 + 1,
            start: w[0],
            end: w[1],
        })
        .collect()
}

/// Find the horizontal and vertical rules of a ruled order page.
pub fn detect_grid(image: &DynamicImage, options: &GridOptions) -> TableGrid {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let mask = ink_mask(&gray, options.ink_threshold);

    let shorter = width.min(height) as f32;
    let vote_threshold = ((shorter * options.rule_vote_fraction) as u32).max(1);
    let lines = detect_lines(
        &mask,
        LineDetectionOptions {
            vote_threshold,
            suppression_radius: options.merge_distance.max(1),
        },
    );

    let (mut ys, mut xs) = (Vec::new(), Vec::new());
    for line in &lines {
        match axis_position(line, options.angle_tolerance) {
            Some(Axis::Horizontal(y)) if y < height => ys.push(y),
            Some(Axis::Vertical(x)) if x < width => xs.push(x),
            _ => {}
        }
    }

    let min_h = (width as f32 * options.rule_vote_fraction) as u32;
    let min_v = (height as f32 * options.rule_vote_fraction) as u32;
    let horizontal: Vec<u32> = merge_positions(ys, options.merge_distance)
        .into_iter()
        .filter(|&y| row_coverage(&mask, y) >= min_h)
        .collect();
    let vertical: Vec<u32> = merge_positions(xs, options.merge_distance)
        .into_iter()
        .filter(|&x| column_coverage(&mask, x) >= min_v)
        .collect();

    debug!(
        candidates = lines.len(),
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        "Detected table grid"
    );

    TableGrid {
        width,
        height,
        horizontal,
        vertical,
        min_band: options.min_row_height,
    }
}

enum Axis {
    Horizontal(u32),
    Vertical(u32),
}

/// imageproc lines satisfy `r = x cos(a) + y sin(a)`: a = 90 is horizontal
/// at y = r; a = 0 is vertical at x = r, and a near 180 at x = -r.
fn axis_position(line: &PolarLine, tolerance: u32) -> Option<Axis> {
    let angle = line.angle_in_degrees;
    let r = line.r.round();
    if angle.abs_diff(90) <= tolerance && r >= 0.0 {
        Some(Axis::Horizontal(r as u32))
    } else if angle <= tolerance && r >= 0.0 {
        Some(Axis::Vertical(r as u32))
    } else if angle >= 180 - tolerance && r <= 0.0 {
        Some(Axis::Vertical((-r) as u32))
    } else {
        None
    }
}

/// Collapse runs of nearby positions into their rounded mean.
fn merge_positions(mut positions: Vec<u32>, distance: u32) -> Vec<u32> {
    positions.sort_unstable();
    let mut merged = Vec::new();
    let mut run: Vec<u32> = Vec::new();
    for p in positions {
        if let Some(&last) = run.last() {
            if p - last > distance {
                merged.push(mean(&run));
                run.clear();
            }
        }
        run.push(p);
    }
    if !run.is_empty() {
        merged.push(mean(&run));
    }
    merged
}

fn mean(values: &[u32]) -> u32 {
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    ((sum as f64 / values.len() as f64).round()) as u32
}

/// Best ink count over the rows within two pixels of `y`.
fn row_coverage(mask: &GrayImage, y: u32) -> u32 {
    let lo = y.saturating_sub(2);
    let hi = (y + 2).min(mask.height().saturating_sub(1));
    (lo..=hi)
        .map(|row| (0..mask.width()).filter(|&x| mask.get_pixel(x, row)[0] > 0).count() as u32)
        .max()
        .unwrap_or(0)
}

fn column_coverage(mask: &GrayImage, x: u32) -> u32 {
    let lo = x.saturating_sub(2);
    let hi = (x + 2).min(mask.width().saturating_sub(1));
    (lo..=hi)
        .map(|col| (0..mask.height()).filter(|&y| mask.get_pixel(col, y)[0] > 0).count() as u32)
        .max()
        .unwrap_or(0)
}

/// Crop the inside of one table cell, trimming `inset` pixels of rule ink
/// from each side.
pub fn crop_cell(image: &DynamicImage, row: &Band, column: &Band, inset: u32) -> DynamicImage {
    let x = (column.start + inset).min(image.width());
    let y = (row.start + inset).min(image.height());
    let w = column.size().saturating_sub(2 * inset);
    let h = row.size().saturating_sub(2 * inset);
    image.crop_imm(x, y, w, h)
}
