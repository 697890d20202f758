//! The two-tier text acquisition stage.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{AcquiredText, DocumentKind, PageOutcome, TextSource, Tier};
use crate::error::{InvtabError, PdfError, Result};
use crate::models::config::InvtabConfig;
use crate::ocr::{create_recognizer, TextRecognizer};
use crate::pdf::{PageRasterizer, PdfExtractor, PdfProcessor, Pdftoppm};

/// Turns one document into raw text.
///
/// Pages are processed sequentially in page order. Nothing is shared between
/// calls, so one instance may serve several documents concurrently.
pub struct TextAcquisition {
    rasterizer: Box<dyn PageRasterizer>,
    recognizer: Box<dyn TextRecognizer>,
    dpi: u32,
    scratch_dir: Option<PathBuf>,
    ocr_enabled: bool,
}

impl TextAcquisition {
    /// Create a stage from a rasterizer and recognizer, rendering at 300 DPI.
    pub fn new<R, O>(rasterizer: R, recognizer: O) -> Self
    where
        R: PageRasterizer + 'static,
        O: TextRecognizer + 'static,
    {
        Self::from_parts(Box::new(rasterizer), Box::new(recognizer))
    }

    /// Create a stage from boxed engines.
    pub fn from_parts(rasterizer: Box<dyn PageRasterizer>, recognizer: Box<dyn TextRecognizer>) -> Self {
        Self {
            rasterizer,
            recognizer,
            dpi: 300,
            scratch_dir: None,
            ocr_enabled: true,
        }
    }

    /// Build the stage described by `config`.
    pub fn from_config(config: &InvtabConfig) -> Result<Self> {
        if config.pdf.render_dpi == 0 {
            return Err(InvtabError::Config("pdf.render_dpi must be positive".to_string()));
        }

        let rasterizer = Pdftoppm::new(&config.pdf.pdftoppm_path);
        let recognizer = create_recognizer(&config.ocr, config.pdf.render_dpi)?;

        let mut stage = Self::from_parts(Box::new(rasterizer), recognizer).with_dpi(config.pdf.render_dpi);
        if let Some(dir) = &config.pipeline.temp_dir {
            stage = stage.with_scratch_dir(dir);
        }
        Ok(stage)
    }

    /// Set the rasterization resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Create rendered pages under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Never fall back to OCR; blank text layers yield blank text.
    pub fn without_ocr(mut self) -> Self {
        self.ocr_enabled = false;
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Name of the OCR engine used for the fallback tier.
    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Acquire text from the document at `path`.
    ///
    /// A zero-length file fails with [`InvtabError::EmptyInput`] before any
    /// parsing, rendering or recognition.
    pub fn acquire_path(&self, path: &Path) -> Result<AcquiredText> {
        let data = std::fs::read(path)?;
        if data.is_empty() {
            return Err(InvtabError::EmptyInput);
        }

        match DocumentKind::detect(&data) {
            DocumentKind::Image => self.acquire_image(path),
            DocumentKind::Pdf => {
                let pdf = PdfExtractor::from_bytes(&data)?;
                self.acquire_pdf(&pdf, path)
            }
        }
    }

    /// Acquire text from an already loaded PDF stored at `path`.
    pub fn acquire_pdf<P>(&self, pdf: &P, path: &Path) -> Result<AcquiredText>
    where
        P: PdfProcessor + ?Sized,
    {
        let start = Instant::now();
        let page_count = pdf.page_count();

        info!("Acquiring text from {} ({} pages)", path.display(), page_count);

        let mut outcomes = Vec::with_capacity(page_count as usize);
        let mut texts = Vec::with_capacity(page_count as usize);

        for page in 1..=page_count {
            match pdf.extract_page_text(page) {
                Ok(text) => {
                    debug!("Page {}: {} chars embedded", page, text.len());
                    outcomes.push(PageOutcome::extracted(page, Tier::Embedded, &text));
                    texts.push(text);
                }
                Err(e) => {
                    warn!("Text extraction failed for page {}: {}", page, e);
                    outcomes.push(PageOutcome::failed(page, Tier::Embedded, e.to_string()));
                }
            }
        }

        let text = texts.join("\n");
        if !text.trim().is_empty() {
            info!(
                "Embedded text: {} chars in {}ms",
                text.len(),
                start.elapsed().as_millis()
            );
            return Ok(AcquiredText {
                text,
                source: TextSource::Embedded,
                pages: outcomes,
            });
        }

        if !self.ocr_enabled {
            debug!("No embedded text and OCR disabled");
            return Ok(AcquiredText {
                text: String::new(),
                source: TextSource::None,
                pages: outcomes,
            });
        }

        info!(
            "No embedded text, falling back to {} OCR at {} DPI",
            self.recognizer_name(),
            self.dpi
        );
        let text = self.ocr_document(path, &mut outcomes)?;

        info!(
            "OCR text: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(AcquiredText {
            text,
            source: TextSource::Ocr,
            pages: outcomes,
        })
    }

    /// Acquire text from a single scanned page image.
    pub fn acquire_image(&self, path: &Path) -> Result<AcquiredText> {
        if !self.ocr_enabled {
            debug!("Image input with OCR disabled");
            return Ok(AcquiredText {
                text: String::new(),
                source: TextSource::None,
                pages: Vec::new(),
            });
        }

        info!("Running {} OCR on image {}", self.recognizer_name(), path.display());

        let mut outcomes = Vec::with_capacity(1);
        let text = self.recognize_page(1, path, &mut outcomes).unwrap_or_default();

        Ok(AcquiredText {
            text,
            source: TextSource::Ocr,
            pages: outcomes,
        })
    }

    /// Render every page and recognize each one independently.
    fn ocr_document(&self, path: &Path, outcomes: &mut Vec<PageOutcome>) -> Result<String> {
        let scratch = self.scratch()?;

        let rendered = self
            .rasterizer
            .rasterize(path, self.dpi, scratch.path())
            .map_err(|e| match e {
                PdfError::RendererUnavailable(msg) => InvtabError::ToolUnavailable(msg),
                other => InvtabError::Unreadable(other),
            })?;

        let texts: Vec<String> = rendered
            .iter()
            .filter_map(|page| self.recognize_page(page.number, &page.path, outcomes))
            .collect();

        Ok(texts.join("\n"))
    }

    fn recognize_page(&self, page: u32, image: &Path, outcomes: &mut Vec<PageOutcome>) -> Option<String> {
        match self.recognizer.recognize(image) {
            Ok(text) => {
                debug!("Page {}: {} chars recognized", page, text.len());
                outcomes.push(PageOutcome::extracted(page, Tier::Ocr, &text));
                Some(text)
            }
            Err(e) => {
                warn!("OCR failed for page {}: {}", page, e);
                outcomes.push(PageOutcome::failed(page, Tier::Ocr, e.to_string()));
                None
            }
        }
    }

    fn scratch(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("invtab-pages-");
        let dir = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::pdf::RenderedPage;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Text layer with one entry per page; `Err` simulates a broken page.
    struct MockPdf {
        pages: Vec<std::result::Result<&'static str, &'static str>>,
    }

    impl PdfProcessor for MockPdf {
        fn load(&mut self, _data: &[u8]) -> crate::pdf::Result<()> {
            Ok(())
        }

        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn extract_page_text(&self, page: u32) -> crate::pdf::Result<String> {
            match self.pages.get(page as usize - 1) {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(reason)) => Err(PdfError::TextExtraction(reason.to_string())),
                None => Err(PdfError::InvalidPage(page)),
            }
        }
    }

    /// Writes empty `page-N.png` files and counts calls.
    struct MockRasterizer {
        pages: u32,
        calls: Arc<AtomicUsize>,
        error: Option<fn() -> PdfError>,
    }

    impl PageRasterizer for MockRasterizer {
        fn rasterize(&self, _document: &Path, _dpi: u32, out_dir: &Path) -> crate::pdf::Result<Vec<RenderedPage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.error {
                return Err(error());
            }
            (1..=self.pages)
                .map(|number| {
                    let path = out_dir.join(format!("page-{}.png", number));
                    std::fs::write(&path, b"").map_err(|e| PdfError::Render(e.to_string()))?;
                    Ok(RenderedPage { number, path })
                })
                .collect()
        }
    }

    /// Returns "page N text" for `page-N.png`, failing on `fail_on`.
    struct MockRecognizer {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<PathBuf>>>,
        fail_on: Option<u32>,
        blank: bool,
    }

    impl TextRecognizer for MockRecognizer {
        fn name(&self) -> &str {
            "mock"
        }

        fn recognize(&self, image: &Path) -> std::result::Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(image.to_path_buf());

            let number: u32 = image
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.rsplit('-').next())
                .and_then(|n| n.parse().ok())
                .unwrap_or(1);

            if self.fail_on == Some(number) {
                return Err(OcrError::Recognition(format!("cannot read page {}", number)));
            }
            if self.blank {
                return Ok("  \n".to_string());
            }
            Ok(format!("{} Item {} 1 10 10", number, number))
        }
    }

    struct Harness {
        stage: TextAcquisition,
        raster_calls: Arc<AtomicUsize>,
        ocr_calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    fn harness(pages: u32, fail_on: Option<u32>) -> Harness {
        harness_with(pages, fail_on, false, None)
    }

    fn harness_with(pages: u32, fail_on: Option<u32>, blank: bool, error: Option<fn() -> PdfError>) -> Harness {
        let raster_calls = Arc::new(AtomicUsize::new(0));
        let ocr_calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let stage = TextAcquisition::new(
            MockRasterizer {
                pages,
                calls: raster_calls.clone(),
                error,
            },
            MockRecognizer {
                calls: ocr_calls.clone(),
                seen: seen.clone(),
                fail_on,
                blank,
            },
        );

        Harness {
            stage,
            raster_calls,
            ocr_calls,
            seen,
        }
    }

    #[test]
    fn test_embedded_text_skips_ocr() {
        let h = harness(2, None);
        let pdf = MockPdf {
            pages: vec![Ok("1 Pens 2 10 20"), Ok("2 Ink 1 5 5")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("doc.pdf")).unwrap();

        assert_eq!(acquired.source, TextSource::Embedded);
        assert_eq!(acquired.text, "1 Pens 2 10 20\n2 Ink 1 5 5");
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_whitespace_text_triggers_ocr_once_per_page() {
        let h = harness(3, None);
        let pdf = MockPdf {
            pages: vec![Ok("   "), Ok("\n\t"), Ok("")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("scan.pdf")).unwrap();

        assert_eq!(acquired.source, TextSource::Ocr);
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 3);
        assert_eq!(acquired.text, "1 Item 1 1 10 10\n2 Item 2 1 10 10\n3 Item 3 1 10 10");

        let ocr_pages: Vec<u32> = acquired
            .pages
            .iter()
            .filter(|p| p.tier == Tier::Ocr)
            .map(|p| p.page)
            .collect();
        assert_eq!(ocr_pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_ocr_failure_on_one_page_keeps_the_rest() {
        let h = harness(3, Some(2));
        let pdf = MockPdf {
            pages: vec![Ok(""), Ok(""), Ok("")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("scan.pdf")).unwrap();

        assert_eq!(acquired.text, "1 Item 1 1 10 10\n3 Item 3 1 10 10");
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 3);

        let warnings = acquired.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("page 2: OCR failed"));
    }

    #[test]
    fn test_embedded_page_failure_is_tolerated() {
        let h = harness(2, None);
        let pdf = MockPdf {
            pages: vec![Err("broken font"), Ok("2 Ink 1 5 5")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("doc.pdf")).unwrap();

        assert_eq!(acquired.source, TextSource::Embedded);
        assert_eq!(acquired.text, "2 Ink 1 5 5");
        assert_eq!(acquired.pages[0], PageOutcome::failed(1, Tier::Embedded, "failed to extract text: broken font"));
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_embedded_pages_failing_falls_back_to_ocr() {
        let h = harness(2, None);
        let pdf = MockPdf {
            pages: vec![Err("bad"), Err("worse")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("doc.pdf")).unwrap();

        assert_eq!(acquired.source, TextSource::Ocr);
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 2);
        assert_eq!(acquired.warnings().len(), 2);
    }

    #[test]
    fn test_blank_document_is_not_an_error() {
        let h = harness_with(2, None, true, None);
        let pdf = MockPdf {
            pages: vec![Ok(""), Ok(" ")],
        };

        let acquired = h.stage.acquire_pdf(&pdf, Path::new("blank.pdf")).unwrap();

        assert!(acquired.is_blank());
        assert!(acquired.warnings().is_empty());
    }

    #[test]
    fn test_render_failure_is_unreadable() {
        let h = harness_with(2, None, false, Some(|| PdfError::Render("syntax error".to_string())));
        let pdf = MockPdf { pages: vec![Ok("")] };

        let err = h.stage.acquire_pdf(&pdf, Path::new("corrupt.pdf")).unwrap_err();

        assert!(matches!(err, InvtabError::Unreadable(PdfError::Render(_))));
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_renderer_is_tool_unavailable() {
        let h = harness_with(
            2,
            None,
            false,
            Some(|| PdfError::RendererUnavailable("pdftoppm: not found".to_string())),
        );
        let pdf = MockPdf { pages: vec![Ok("")] };

        let err = h.stage.acquire_pdf(&pdf, Path::new("scan.pdf")).unwrap_err();
        assert!(matches!(err, InvtabError::ToolUnavailable(_)));
    }

    #[test]
    fn test_without_ocr() {
        let h = harness(2, None);
        let stage = h.stage.without_ocr();
        let pdf = MockPdf {
            pages: vec![Ok(" "), Ok("")],
        };

        let acquired = stage.acquire_pdf(&pdf, Path::new("scan.pdf")).unwrap();

        assert_eq!(acquired.source, TextSource::None);
        assert!(acquired.is_blank());
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_file_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let h = harness(1, None);
        let err = h.stage.acquire_path(&path).unwrap_err();

        assert!(matches!(err, InvtabError::EmptyInput));
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pdf");
        std::fs::write(&path, b"definitely not a page container").unwrap();

        let h = harness(1, None);
        let err = h.stage.acquire_path(&path).unwrap_err();

        assert!(matches!(err, InvtabError::Unreadable(PdfError::Parse(_))));
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_image_input_goes_straight_to_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        let h = harness(1, None);
        let acquired = h.stage.acquire_path(&path).unwrap();

        assert_eq!(acquired.source, TextSource::Ocr);
        assert_eq!(acquired.text, "1 Item 1 1 10 10");
        assert_eq!(h.raster_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.seen.lock().unwrap().as_slice(), &[path]);
    }

    #[test]
    fn test_rendered_pages_are_removed() {
        let scratch = tempfile::tempdir().unwrap();
        let h = harness(2, None);
        let stage = h.stage.with_scratch_dir(scratch.path());
        let pdf = MockPdf {
            pages: vec![Ok(""), Ok("")],
        };

        stage.acquire_pdf(&pdf, Path::new("scan.pdf")).unwrap();

        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|p| p.starts_with(scratch.path())));
        assert!(seen.iter().all(|p| !p.exists()));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_dpi_is_rejected() {
        let mut config = InvtabConfig::default();
        config.pdf.render_dpi = 0;
        assert!(matches!(TextAcquisition::from_config(&config), Err(InvtabError::Config(_))));
    }

    #[test]
    fn test_from_config_uses_configured_engine() {
        let mut config = InvtabConfig::default();
        config.pdf.render_dpi = 200;

        let stage = TextAcquisition::from_config(&config).unwrap();

        assert_eq!(stage.recognizer_name(), "tesseract");
        assert_eq!(stage.dpi(), 200);
    }
}
