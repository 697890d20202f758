//! The document-to-table pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::acquisition::{AcquiredText, DocumentKind, PageOutcome, TextAcquisition, TextSource};
use crate::error::{InvtabError, Result};
use crate::invoice::RowParser;
use crate::models::config::InvtabConfig;
use crate::models::invoice::InvoiceTable;

/// Result of running one document through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Extracted line items in source order.
    pub table: InvoiceTable,

    /// Tier that produced the text the table was parsed from.
    pub source: TextSource,

    /// Per-page acquisition outcomes.
    pub pages: Vec<PageOutcome>,

    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,

    /// The raw text the table was parsed from.
    #[serde(skip)]
    pub text: String,
}

impl Extraction {
    /// True when no line matched a row grammar.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Page failures plus data-quality notes about the table.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self.pages.iter().filter_map(|p| p.warning()).collect();

        let duplicates = self.table.duplicate_serials();
        if !duplicates.is_empty() {
            let list: Vec<String> = duplicates.iter().map(|s| s.to_string()).collect();
            warnings.push(format!("duplicate S.No values: {}", list.join(", ")));
        }

        warnings
    }
}

/// Text acquisition followed by row parsing.
pub struct InvoicePipeline {
    acquisition: TextAcquisition,
    parser: RowParser,
    temp_dir: Option<PathBuf>,
}

impl InvoicePipeline {
    pub fn new(acquisition: TextAcquisition, parser: RowParser) -> Self {
        Self {
            acquisition,
            parser,
            temp_dir: None,
        }
    }

    /// Build the pipeline described by `config`.
    pub fn from_config(config: &InvtabConfig) -> Result<Self> {
        let acquisition = TextAcquisition::from_config(config)?;
        let parser = RowParser::from_config(&config.extraction)?;

        let mut pipeline = Self::new(acquisition, parser);
        if let Some(dir) = &config.pipeline.temp_dir {
            pipeline = pipeline.with_temp_dir(dir);
        }
        Ok(pipeline)
    }

    /// Write transient document copies under `dir`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Never fall back to OCR.
    pub fn without_ocr(mut self) -> Self {
        self.acquisition = self.acquisition.without_ocr();
        self
    }

    pub fn acquisition(&self) -> &TextAcquisition {
        &self.acquisition
    }

    pub fn parser(&self) -> &RowParser {
        &self.parser
    }

    /// Run only the acquisition stage.
    pub fn acquire_path(&self, path: &Path) -> Result<AcquiredText> {
        self.acquisition.acquire_path(path)
    }

    /// Extract the line-item table from the document at `path`.
    pub fn extract_path(&self, path: &Path) -> Result<Extraction> {
        let start = Instant::now();

        let acquired = self.acquisition.acquire_path(path)?;
        let table = self.parser.parse_table(&acquired.text);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} rows from {} ({:?}) in {}ms",
            table.len(),
            path.display(),
            acquired.source,
            processing_time_ms
        );

        Ok(Extraction {
            table,
            source: acquired.source,
            pages: acquired.pages,
            processing_time_ms,
            text: acquired.text,
        })
    }

    /// Extract the line-item table from an in-memory document.
    ///
    /// The bytes are copied to a transient file that is removed before this
    /// returns, whether extraction succeeded or not.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<Extraction> {
        if data.is_empty() {
            return Err(InvtabError::EmptyInput);
        }

        let kind = DocumentKind::detect(data);
        let mut builder = tempfile::Builder::new();
        builder.prefix("invtab-").suffix(kind.suffix());
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(data)?;
        file.flush()?;
        debug!("Copied {} bytes to {}", data.len(), file.path().display());

        self.extract_path(file.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use crate::ocr::TextRecognizer;
    use crate::pdf::{PageRasterizer, RenderedPage, fixtures};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct OnePageRasterizer;

    impl PageRasterizer for OnePageRasterizer {
        fn rasterize(&self, _document: &Path, _dpi: u32, out_dir: &Path) -> crate::pdf::Result<Vec<RenderedPage>> {
            let path = out_dir.join("page-1.png");
            std::fs::write(&path, b"").map_err(|e| PdfError::Render(e.to_string()))?;
            Ok(vec![RenderedPage { number: 1, path }])
        }
    }

    struct FixedRecognizer {
        text: &'static str,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, image: &Path) -> std::result::Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(image.to_path_buf());
            Ok(self.text.to_string())
        }
    }

    fn pipeline(text: &'static str) -> (InvoicePipeline, Arc<AtomicUsize>, Arc<Mutex<Vec<PathBuf>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let acquisition = TextAcquisition::new(
            OnePageRasterizer,
            FixedRecognizer {
                text,
                calls: calls.clone(),
                seen: seen.clone(),
            },
        );
        (InvoicePipeline::new(acquisition, RowParser::new()), calls, seen)
    }

    fn png_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        image::RgbImage::new(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_text_pdf_uses_embedded_text() {
        let (pipeline, calls, _) = pipeline("9 Should Not Appear 1 1 1");
        let pdf = fixtures::text_lines(&[&[
            "TAX INVOICE",
            "1 Ball Pens 20 150.0 3000.0",
            "2 Lunch Boxes 15 800.0 12000.0",
            "Grand Total 15000.0",
        ]]);

        let extraction = pipeline.extract_bytes(&pdf).unwrap();

        assert_eq!(extraction.source, TextSource::Embedded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let descriptions: Vec<&str> = extraction.table.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Ball Pens", "Lunch Boxes"]);
    }

    #[test]
    fn test_positioned_cells_parse_as_rows() {
        let (pipeline, calls, _) = pipeline("9 Should Not Appear 1 1 1");
        let pdf = fixtures::table_cells(&[
            ["S.No", "Item Description", "Quantity", "Unit Price", "Total"],
            ["1", "Ball Pens", "20", "150.0", "3000.0"],
            ["2", "Lunch Boxes", "15", "800.0", "12,000.0"],
        ]);

        let extraction = pipeline.extract_bytes(&pdf).unwrap();

        assert_eq!(extraction.source, TextSource::Embedded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let rows = extraction.table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].serial, 1);
        assert_eq!(rows[0].description, "Ball Pens");
        assert_eq!(rows[1].description, "Lunch Boxes");
        assert_eq!(rows[1].quantity, 15);
        assert_eq!(rows[1].total.to_string(), "12000.0");
    }

    #[test]
    fn test_pdf_without_text_falls_back_to_ocr() {
        let (pipeline, calls, _) = pipeline("1 Scanned Item 2 10 20");
        let pdf = fixtures::text_lines(&[&[]]);

        let extraction = pipeline.extract_bytes(&pdf).unwrap();

        assert_eq!(extraction.source, TextSource::Ocr);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(extraction.table.len(), 1);
        assert_eq!(extraction.table.rows()[0].description, "Scanned Item");
    }

    #[test]
    fn test_temp_copy_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _, seen) = pipeline("1 Pens 2 10 20\n1 Pens 2 10 20");
        let pipeline = pipeline.with_temp_dir(dir.path());

        let extraction = pipeline.extract_bytes(&png_bytes()).unwrap();

        assert_eq!(extraction.table.len(), 2);
        assert_eq!(extraction.warnings(), vec!["duplicate S.No values: 1".to_string()]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with(dir.path()));
        assert!(!seen[0].exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_copy_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls, _) = pipeline("");
        let pipeline = pipeline.with_temp_dir(dir.path());

        let err = pipeline.extract_bytes(b"this is not a document").unwrap_err();

        assert!(matches!(err, InvtabError::Unreadable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls, _) = pipeline("");
        let pipeline = pipeline.with_temp_dir(dir.path());

        assert!(matches!(pipeline.extract_bytes(&[]), Err(InvtabError::EmptyInput)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_no_rows_is_not_an_error() {
        let (pipeline, _, _) = pipeline("Thank you for your business");

        let extraction = pipeline.extract_bytes(&png_bytes()).unwrap();

        assert!(extraction.is_empty());
        assert_eq!(extraction.text, "Thank you for your business");
        assert!(extraction.warnings().is_empty());
    }

    #[test]
    fn test_extraction_json() {
        let (pipeline, _, _) = pipeline("1 Stapler 5 1,200.50 6,002.50");

        let extraction = pipeline.extract_bytes(&png_bytes()).unwrap();
        let json = serde_json::to_value(&extraction).unwrap();

        assert_eq!(json["source"], "ocr");
        assert_eq!(json["table"][0]["S.No"], 1);
        assert_eq!(json["table"][0]["Item Description"], "Stapler");
        assert_eq!(json["table"][0]["Quantity"], 5);
        assert_eq!(json["table"][0]["Unit Price"], "1200.50");
        assert_eq!(json["table"][0]["Total"], "6002.50");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_without_ocr_leaves_scans_blank() {
        let (pipeline, calls, _) = pipeline("1 Scanned Item 2 10 20");
        let pipeline = pipeline.without_ocr();

        let extraction = pipeline.extract_bytes(&fixtures::text_lines(&[&[]])).unwrap();

        assert_eq!(extraction.source, TextSource::None);
        assert!(extraction.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let mut config = InvtabConfig::default();
        config.extraction.extra_patterns.push("(".to_string());
        assert!(matches!(InvoicePipeline::from_config(&config), Err(InvtabError::Config(_))));
    }
}
