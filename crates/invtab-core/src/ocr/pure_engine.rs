//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::GenericImageView;
use tracing::{debug, info};

use super::TextRecognizer;
use crate::error::OcrError;

/// A box joins the current line when its top edge is within this distance
/// of the previous box's top edge.
const LINE_TOLERANCE_PX: f64 = 15.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external binaries).
pub struct PureOcrRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

/// A recognized text box reduced to its top-left corner.
struct PlacedText {
    x: f64,
    y: f64,
    text: String,
}

impl PureOcrRecognizer {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl TextRecognizer for PureOcrRecognizer {
    fn name(&self) -> &str {
        "pure-onnx-ocr"
    }

    fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        let start = Instant::now();

        let img = image::open(image).map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let (width, height) = img.dimensions();

        let results = self
            .engine
            .run_from_image(&img)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let boxes: Vec<PlacedText> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                PlacedText {
                    x,
                    y,
                    text: r.text.replace("[UNK]", " "),
                }
            })
            .collect();

        let text = join_into_lines(boxes);

        debug!(
            "pure-onnx-ocr read {} regions from {}x{} image in {}ms",
            results.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}

/// Rebuild text lines from boxes: group by vertical proximity, then order
/// each line by x.
///
/// Boxes on one line are joined with a double space so the row parser sees a
/// column gap.
fn join_into_lines(mut boxes: Vec<PlacedText>) -> String {
    boxes.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut lines: Vec<Vec<PlacedText>> = Vec::new();
    let mut last_y: Option<f64> = None;

    for b in boxes {
        let y = b.y;
        match (last_y, lines.last_mut()) {
            (Some(prev), Some(line)) if (y - prev).abs() <= LINE_TOLERANCE_PX => line.push(b),
            _ => lines.push(vec![b]),
        }
        last_y = Some(y);
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|b| b.text.trim())
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
