//! Core library for invoice line-item extraction.
//!
//! This crate provides:
//! - PDF text layer access (lopdf, pdf-extract) and page rasterization (poppler)
//! - OCR of rendered pages and scanned images
//! - Two-tier text acquisition with per-page outcomes
//! - Row parsing of noisy text into typed line items

pub mod acquisition;
pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

pub use acquisition::{AcquiredText, DocumentKind, PageOutcome, PageStatus, TextAcquisition, TextSource, Tier};
pub use error::{InvtabError, OcrError, PdfError, Result};
pub use invoice::{FiveColumnGrammar, LineGrammar, PatternGrammar, RowParser, normalize_line};
pub use models::config::InvtabConfig;
pub use models::invoice::{COLUMNS, InvoiceTable, RowRecord};
pub use ocr::{TextRecognizer, TesseractRecognizer, create_recognizer};
pub use pdf::{PageRasterizer, PdfExtractor, PdfProcessor, Pdftoppm};
pub use pipeline::{Extraction, InvoicePipeline};
