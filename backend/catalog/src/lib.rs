//! Shape catalog: the reference JSON describing every bent-iron template.
//!
//! The file is an object keyed by catalog number. Each shape lists its ribs
//! and angles in drawing order, with `is90` fixed on right angles.

pub mod shape;

pub use shape::{catalog_image_path, Catalog, CatalogShape};
