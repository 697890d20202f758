//! Error types for the invtab-core library.

use thiserror::Error;

/// Main error type for the invtab library.
///
/// Only document-level failures live here. Problems confined to a single page
/// are recorded as [`crate::acquisition::PageOutcome`]s and never abort a
/// document.
#[derive(Error, Debug)]
pub enum InvtabError {
    /// The supplied document has zero length.
    #[error("empty input: document has zero length")]
    EmptyInput,

    /// The page container could not be parsed or rasterized.
    #[error("unreadable document: {0}")]
    Unreadable(#[from] PdfError),

    /// An external tool required by the pipeline could not be started.
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    /// OCR backend could not be constructed.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to render pages to bitmaps.
    #[error("failed to render pages: {0}")]
    Render(String),

    /// The rendering tool could not be spawned.
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine binary could not be spawned.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the invtab library.
pub type Result<T> = std::result::Result<T, InvtabError>;
