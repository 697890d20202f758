//! PDF processing module: text layer access and page rasterization.

mod extractor;
#[cfg(test)]
pub(crate) mod fixtures;
mod raster;

pub use extractor::PdfExtractor;
pub use raster::{PageRasterizer, Pdftoppm, RenderedPage};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for access to a PDF's embedded text layer.
pub trait PdfProcessor {
    /// Parse `data` as a PDF, replacing any previously loaded document.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Number of pages, or 0 before a successful `load`.
    fn page_count(&self) -> u32;

    /// Text layer of page `page` (1-indexed). Failure is confined to that page.
    fn extract_page_text(&self, page: u32) -> Result<String>;
}
