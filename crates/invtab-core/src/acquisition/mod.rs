//! Text acquisition: embedded text first, OCR of rendered pages as fallback.

mod stage;

pub use stage::TextAcquisition;

use serde::Serialize;

/// How far into a file a PDF header may start.
const PDF_HEADER_WINDOW: usize = 1024;

/// Kind of input document, decided from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A PDF page container.
    Pdf,
    /// A single scanned page in a common raster format.
    Image,
}

impl DocumentKind {
    /// Sniff the document kind. Unknown data is treated as PDF so that the
    /// PDF parser reports it as unreadable.
    pub fn detect(data: &[u8]) -> Self {
        let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
        if window.windows(5).any(|w| w == b"%PDF-") {
            return Self::Pdf;
        }
        if image::guess_format(data).is_ok() {
            return Self::Image;
        }
        Self::Pdf
    }

    /// File suffix for transient copies.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Image => ".img",
        }
    }
}

/// The acquisition method a page outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Text read from the document's text layer.
    Embedded,
    /// Text recognized from a rendered bitmap.
    Ocr,
}

/// Which tier produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Embedded,
    Ocr,
    /// No tier ran successfully far enough to produce text.
    None,
}

/// Result of one page in one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageStatus {
    /// Text obtained (possibly only whitespace).
    Extracted { chars: usize },
    /// The page contributed no text.
    Failed { reason: String },
}

/// Per-page record kept by the acquisition stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageOutcome {
    /// Page number (1-indexed).
    pub page: u32,
    pub tier: Tier,
    #[serde(flatten)]
    pub status: PageStatus,
}

impl PageOutcome {
    pub fn extracted(page: u32, tier: Tier, text: &str) -> Self {
        Self {
            page,
            tier,
            status: PageStatus::Extracted {
                chars: text.chars().count(),
            },
        }
    }

    pub fn failed(page: u32, tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            page,
            tier,
            status: PageStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, PageStatus::Failed { .. })
    }

    /// Human-readable warning for failed pages.
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            PageStatus::Failed { reason } => {
                let tier = match self.tier {
                    Tier::Embedded => "text extraction",
                    Tier::Ocr => "OCR",
                };
                Some(format!("page {}: {} failed: {}", self.page, tier, reason))
            }
            PageStatus::Extracted { .. } => None,
        }
    }
}

/// Raw text from one document plus how it was obtained.
#[derive(Debug, Clone)]
pub struct AcquiredText {
    /// All pages' text in page order, joined with line breaks.
    pub text: String,
    pub source: TextSource,
    /// Outcomes for every page attempted, in the order attempted.
    pub pages: Vec<PageOutcome>,
}

impl AcquiredText {
    /// True when no tier found any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Warnings for every page that failed in any tier.
    pub fn warnings(&self) -> Vec<String> {
        self.pages.iter().filter_map(|p| p.warning()).collect()
    }
}
