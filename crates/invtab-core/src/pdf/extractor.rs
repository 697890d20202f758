//! Embedded text extraction using lopdf and pdf-extract.

use std::panic::{AssertUnwindSafe, catch_unwind};

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// Per-page text, or the reason the page could not be read.
type PageText = std::result::Result<String, String>;

/// PDF text-layer extractor.
///
/// lopdf parses and decrypts the container; pdf-extract lays out each page's
/// glyphs by position so table cells come out as spaced columns on one line.
pub struct PdfExtractor {
    document: Option<Document>,
    pages: Vec<PageText>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            pages: Vec::new(),
        }
    }

    /// Create an extractor with `data` already loaded.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut extractor = Self::new();
        extractor.load(data)?;
        Ok(extractor)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len() as u32;
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.pages = text_by_page(&doc, &raw_data, page_count, layout_text);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn extract_page_text(&self, page: u32) -> Result<String> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        let index = page.checked_sub(1).ok_or(PdfError::InvalidPage(page))? as usize;
        match self.pages.get(index) {
            Some(Ok(text)) => {
                trace!("Page {}: {} chars of embedded text", page, text.len());
                Ok(text.clone())
            }
            Some(Err(reason)) => Err(PdfError::TextExtraction(format!("page {}: {}", page, reason))),
            None => Err(PdfError::InvalidPage(page)),
        }
    }
}

/// Run pdf-extract over a whole document, one string per page.
///
/// pdf-extract panics on some malformed fonts; a panic becomes an error.
fn layout_text(data: &[u8]) -> std::result::Result<Vec<String>, String> {
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(data))) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked".to_string()),
    }
}

/// Text of every page, in page order.
///
/// The whole document is tried in one pass first. If that fails, each page is
/// split into its own document and extracted alone, so one bad page only
/// loses its own text.
fn text_by_page<F>(doc: &Document, raw_data: &[u8], page_count: u32, extract: F) -> Vec<PageText>
where
    F: Fn(&[u8]) -> std::result::Result<Vec<String>, String>,
{
    match extract(raw_data) {
        Ok(pages) if pages.len() == page_count as usize => return pages.into_iter().map(Ok).collect(),
        Ok(pages) => warn!(
            "Text layer returned {} pages, expected {}; extracting pages one by one",
            pages.len(),
            page_count
        ),
        Err(e) => warn!("Text layer extraction failed ({}); extracting pages one by one", e),
    }

    (1..=page_count)
        .map(|page| -> PageText {
            let single = single_page(doc, page, page_count)?;
            let texts = extract(&single)?;
            Ok(texts.join("\n"))
        })
        .collect()
}

/// Serialize a copy of `doc` that keeps only `page`.
fn single_page(doc: &Document, page: u32, page_count: u32) -> std::result::Result<Vec<u8>, String> {
    let others: Vec<u32> = (1..=page_count).filter(|p| *p != page).collect();

    let mut copy = doc.clone();
    copy.delete_pages(&others);

    let mut buf = Vec::new();
    copy.save_to(&mut buf).map_err(|e| e.to_string())?;
    Ok(buf)
}
