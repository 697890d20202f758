//! Page rasterization through poppler's `pdftoppm`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};

use super::Result;
use crate::error::PdfError;

/// A page rendered to an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Location of the rendered bitmap.
    pub path: PathBuf,
}

/// Renders every page of a document to a bitmap.
pub trait PageRasterizer: Send + Sync {
    /// Render all pages of `document` at `dpi` into `out_dir`, in page order.
    ///
    /// An error means the document as a whole could not be rendered.
    fn rasterize(&self, document: &Path, dpi: u32, out_dir: &Path) -> Result<Vec<RenderedPage>>;
}

/// Rasterizer invoking the `pdftoppm` command-line tool.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    binary: PathBuf,
}

impl Pdftoppm {
    /// Use the given `pdftoppm` binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PageRasterizer for Pdftoppm {
    fn rasterize(&self, document: &Path, dpi: u32, out_dir: &Path) -> Result<Vec<RenderedPage>> {
        let prefix = out_dir.join("page");

        debug!("Rendering {} at {} DPI", document.display(), dpi);

        let output = Command::new(&self.binary)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg(document)
            .arg(&prefix)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    PdfError::RendererUnavailable(format!("{}: {}", self.binary.display(), e))
                }
                _ => PdfError::Render(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PdfError::Render(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let pages = collect_pages(out_dir).map_err(|e| PdfError::Render(e.to_string()))?;
        if pages.is_empty() {
            return Err(PdfError::Render("pdftoppm produced no images".to_string()));
        }

        for page in &pages {
            match image::image_dimensions(&page.path) {
                Ok((w, h)) => trace!("Rendered page {}: {}x{}", page.number, w, h),
                Err(e) => trace!("Rendered page {} is not decodable: {}", page.number, e),
            }
        }

        debug!("Rendered {} pages", pages.len());
        Ok(pages)
    }
}

/// Collect `page-N.png` files from `dir`, sorted by page number.
fn collect_pages(dir: &Path) -> std::io::Result<Vec<RenderedPage>> {
    let mut pages: Vec<RenderedPage> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .filter_map(|path| {
            let number = page_number(&path)?;
            Some(RenderedPage { number, path })
        })
        .collect();

    pages.sort_by_key(|p| p.number);
    Ok(pages)
}

/// Page number from a pdftoppm file name (`page-07.png` -> 7).
fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != "page" {
        return None;
    }
    number.parse().ok()
}
