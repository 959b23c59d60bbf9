//! Image side of the pipeline: PDF pages in, table rows and shape crops out.

pub mod grid;
pub mod mime_detect;
pub mod pdf;
pub mod prefilter;
pub mod raster;

pub use grid::{crop_cell, detect_grid, Band, GridOptions, TableGrid};
pub use mime_detect::{detect_mime_type, is_image, is_pdf, is_vision_safe};
pub use pdf::{render_pdf_pages, PageImage};
pub use prefilter::{check_shape_crop, ShapeCheck, ShapeCheckOptions};
pub use raster::{ink_mask, load_image, read_image_bytes};
