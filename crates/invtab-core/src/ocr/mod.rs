//! OCR backends for rendered pages and scanned images.

#[cfg(feature = "onnx")]
mod pure_engine;
mod tesseract;

#[cfg(feature = "onnx")]
pub use pure_engine::PureOcrRecognizer;
pub use tesseract::TesseractRecognizer;

use std::path::Path;

use crate::error::OcrError;
use crate::models::config::{OcrBackend, OcrConfig};

/// Recognizes the text in one page image.
pub trait TextRecognizer: Send + Sync {
    /// Short engine name for logs and reports.
    fn name(&self) -> &str;

    /// Run recognition on the image at `image`, returning its text with one
    /// visual line per text line.
    fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Build the recognizer selected by `config`.
///
/// `dpi` is the resolution pages are rendered at, passed to engines that
/// benefit from knowing it.
pub fn create_recognizer(config: &OcrConfig, dpi: u32) -> Result<Box<dyn TextRecognizer>, OcrError> {
    match config.backend {
        OcrBackend::Tesseract => {
            let mut recognizer = TesseractRecognizer::new(&config.tesseract_path)
                .with_language(&config.language)
                .with_dpi(dpi);
            if let Some(psm) = config.page_segmentation_mode {
                recognizer = recognizer.with_page_segmentation_mode(psm);
            }
            Ok(Box::new(recognizer))
        }
        #[cfg(feature = "onnx")]
        OcrBackend::Onnx => Ok(Box::new(PureOcrRecognizer::from_dir(&config.model_dir)?)),
        #[cfg(not(feature = "onnx"))]
        OcrBackend::Onnx => Err(OcrError::ModelLoad(
            "ONNX backend requires building with the `onnx` feature".to_string(),
        )),
    }
}
