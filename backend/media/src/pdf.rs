//! PDF to page images via poppler's `pdftoppm`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// One rendered page. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub number: u32,
    pub path: PathBuf,
}

const PAGE_PREFIX: &str = "page";

/// Render every page of `pdf` into `out_dir` as PNG, in page order.
pub async fn render_pdf_pages(pdf: &Path, out_dir: &Path, dpi: u32) -> Result<Vec<PageImage>> {
    info!(pdf = %pdf.display(), out = %out_dir.display(), dpi, "Rendering PDF pages");
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create page directory: {}", out_dir.display()))?;

    let output = Command::new("pdftoppm")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(pdf)
        .arg(out_dir.join(PAGE_PREFIX))
        .output()
        .await
        .context("Failed to run pdftoppm (is poppler installed?)")?;
    if !output.status.success() {
        bail!(
            "pdftoppm failed for {}: {}",
            pdf.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(number) = path.file_name().and_then(|n| n.to_str()).and_then(page_number) {
            pages.push(PageImage { number, path });
        }
    }
    pages.sort_by_key(|p| p.number);
    debug!(pages = pages.len(), "Rendered PDF");
    Ok(pages)
}

/// `page-1.png`, `page-01.png` and `page-001.png` are all page 1.
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
