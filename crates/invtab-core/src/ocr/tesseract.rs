//! OCR through the tesseract command-line tool.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::debug;

use super::TextRecognizer;
use crate::error::OcrError;

/// Recognizer that shells out to `tesseract <image> stdout`.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
    dpi: Option<u32>,
    page_segmentation_mode: Option<u8>,
}

impl TesseractRecognizer {
    /// Use the given tesseract binary with English recognition.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            language: "eng".to_string(),
            dpi: None,
            page_segmentation_mode: None,
        }
    }

    /// Set the recognition language(s).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Tell tesseract the resolution of the input images.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// Set the page segmentation mode (`--psm`).
    pub fn with_page_segmentation_mode(mut self, psm: u8) -> Self {
        self.page_segmentation_mode = Some(psm);
        self
    }

    fn command(&self, image: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image).arg("stdout").arg("-l").arg(&self.language);
        if let Some(dpi) = self.dpi {
            cmd.arg("--dpi").arg(dpi.to_string());
        }
        if let Some(psm) = self.page_segmentation_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let start = Instant::now();

        let output = self.command(image).output().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                OcrError::EngineUnavailable(format!("{}: {}", self.binary.display(), e))
            }
            _ => OcrError::Recognition(e.to_string()),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();

        debug!(
            "tesseract read {} chars from {} in {}ms",
            text.len(),
            image.display(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}
