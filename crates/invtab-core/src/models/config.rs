//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the tesseract binary location.
pub const ENV_TESSERACT: &str = "INVTAB_TESSERACT";
/// Environment variable overriding the pdftoppm binary location.
pub const ENV_PDFTOPPM: &str = "INVTAB_PDFTOPPM";
/// Environment variable overriding the OCR language.
pub const ENV_OCR_LANG: &str = "INVTAB_OCR_LANG";

/// Main configuration for the invtab pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvtabConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Row extraction configuration.
    pub extraction: ExtractionConfig,

    /// Pipeline resource configuration.
    pub pipeline: PipelineConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images before OCR.
    pub render_dpi: u32,

    /// Path or name of the `pdftoppm` binary.
    pub pdftoppm_path: PathBuf,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            pdftoppm_path: PathBuf::from("pdftoppm"),
        }
    }
}

/// OCR backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// External tesseract binary.
    Tesseract,
    /// Pure Rust ONNX engine (requires the `onnx` feature).
    Onnx,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Which OCR engine to run.
    pub backend: OcrBackend,

    /// Path or name of the `tesseract` binary.
    pub tesseract_path: PathBuf,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    pub language: String,

    /// Tesseract page segmentation mode (`--psm`), engine default when unset.
    pub page_segmentation_mode: Option<u8>,

    /// Directory with det.onnx, latin_rec.onnx and latin_dict.txt for the ONNX backend.
    pub model_dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: None,
            model_dir: PathBuf::from("models"),
        }
    }
}

/// Row extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Additional line patterns tried before the built-in five-column grammar.
    ///
    /// Each pattern must define the named groups `sno`, `description`, `qty`,
    /// `price` and `total`.
    pub extra_patterns: Vec<String>,
}

/// Resource configuration for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory for transient document copies and rendered pages.
    /// The system temp directory is used when unset.
    pub temp_dir: Option<PathBuf>,
}

impl InvtabConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Apply engine locations from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply engine locations from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_TESSERACT).filter(|v| !v.is_empty()) {
            self.ocr.tesseract_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_PDFTOPPM).filter(|v| !v.is_empty()) {
            self.pdf.pdftoppm_path = PathBuf::from(path);
        }
        if let Some(lang) = lookup(ENV_OCR_LANG).filter(|v| !v.is_empty()) {
            self.ocr.language = lang;
        }
        self
    }
}
