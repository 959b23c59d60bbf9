//! `pages`, `rows` and `check`: the image stages before the vision call.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use bendline_media::{
    check_shape_crop, crop_cell, detect_grid, detect_mime_type, is_pdf, load_image,
    render_pdf_pages, Band, TableGrid,
};

use crate::context::AppContext;
use crate::terminal_output::{note_info, note_success, note_warn, render_table, Column};

/// Rule ink trimmed from each side of a cell crop.
const CELL_INSET: u32 = 3;

pub async fn pages(pdf: &Path, out_dir: &Path, dpi: u32) -> Result<()> {
    if !is_pdf(detect_mime_type(pdf)) {
        bail!("{} is not a PDF", pdf.display());
    }
    let pages = render_pdf_pages(pdf, out_dir, dpi).await?;
    for page in &pages {
        println!("{}\t{}", page.number, page.path.display());
    }
    note_success(&format!("Rendered {} page(s) to {}", pages.len(), out_dir.display()));
    Ok(())
}

/// The shape column is the one the caller names, or else the widest.
fn pick_column(grid: &TableGrid, column: Option<u32>) -> Result<Band> {
    let columns = grid.columns();
    match column {
        Some(n) => columns
            .into_iter()
            .find(|c| c.index == n)
            .with_context(|| format!("table has no column {n}")),
        None => columns
            .into_iter()
            .max_by_key(Band::size)
            .context("table has no columns"),
    }
}

pub async fn rows(ctx: &AppContext, image_path: &Path, out_dir: &Path, column: Option<u32>) -> Result<()> {
    let image = load_image(image_path)?;
    let grid_options = ctx.grid_options();
    let check_options = ctx.shape_check_options();
    let out: PathBuf = out_dir.to_path_buf();

    let report = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<String>>> {
        let grid = detect_grid(&image, &grid_options);
        if !grid.is_table() {
            bail!("no ruled table found");
        }
        let shape_column = pick_column(&grid, column)?;
        std::fs::create_dir_all(&out)
            .with_context(|| format!("Failed to create row directory: {}", out.display()))?;

        let mut report = Vec::new();
        for row in grid.rows() {
            let crop = crop_cell(&image, &row, &shape_column, CELL_INSET);
            let check = check_shape_crop(&crop, &check_options);
            let path = out.join(format!("row_{:02}.png", row.index));
            crop.save(&path)
                .with_context(|| format!("Failed to write crop: {}", path.display()))?;
            report.push(vec![
                row.index.to_string(),
                format!("{}..{}", row.start, row.end),
                if check.has_drawing { "yes" } else { "no" }.to_string(),
                path.display().to_string(),
            ]);
        }
        Ok(report)
    })
    .await??;

    info!(image = %image_path.display(), rows = report.len(), "Cropped table rows");
    if report.is_empty() {
        note_warn("Table found but no rows tall enough to hold a drawing");
        return Ok(());
    }
    print!(
        "{}",
        render_table(
            &[
                Column::right("Row"),
                Column::left("Span"),
                Column::left("Drawing"),
                Column::left("Crop"),
            ],
            &report,
        )
    );
    Ok(())
}

pub async fn check(ctx: &AppContext, image_path: &Path) -> Result<bool> {
    let image = load_image(image_path)?;
    let options = ctx.shape_check_options();
    let check = tokio::task::spawn_blocking(move || check_shape_crop(&image, &options)).await?;

    note_info(&format!(
        "{} line(s), {} contour(s), ink {:.1}%",
        check.line_count,
        check.contour_count,
        check.ink_ratio * 100.0
    ));
    if check.has_drawing {
        note_success("Drawing found");
    } else {
        note_warn("No drawing found");
    }
    Ok(check.has_drawing)
}
