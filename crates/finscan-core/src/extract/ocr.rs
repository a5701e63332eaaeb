//! OCR engines for image receipts.

use std::path::{Path, PathBuf};
use std::process::Command;
#[cfg(feature = "native")]
use std::time::Instant;

use tracing::debug;
#[cfg(feature = "native")]
use tracing::info;

use super::{EngineFailure, ExtractionMethod, ExtractionResult, ExtractionStrategy};
use crate::error::ExtractError;
use crate::models::config::OcrConfig;

/// Confidence reported for tesseract output, which carries no score.
///
/// Use [`ExtractionMethod`] to tell engines apart, never this value.
pub const TESSERACT_CONFIDENCE: f32 = 0.8;

/// Layout-aware OCR backed by `pure-onnx-ocr`.
///
/// Models are loaded per call so the engine holds no model state.
#[derive(Debug, Clone)]
pub struct LayoutOcrEngine {
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
    keep_unk: bool,
}

/// A recognized line positioned on the page.
#[cfg(feature = "native")]
struct RecognizedLine {
    x: f64,
    y: f64,
    text: String,
    confidence: f32,
}

impl LayoutOcrEngine {
    const NAME: &'static str = "layout-ocr";

    /// Vertical distance (px) within which boxes count as the same row.
    #[cfg(feature = "native")]
    const ROW_HEIGHT: f64 = 20.0;

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            det_path: config.model_path(&config.detection_model),
            rec_path: config.model_path(&config.recognition_model),
            dict_path: config.model_path(&config.dictionary),
            keep_unk: config.keep_unk,
        }
    }

    #[cfg(feature = "native")]
    fn recognize(&self, path: &Path) -> Result<ExtractionResult, ExtractError> {
        let start = Instant::now();
        let image = image::open(path).map_err(|e| ExtractError::engine(Self::NAME, e))?;

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&self.det_path)
            .rec_model_path(&self.rec_path)
            .dictionary_path(&self.dict_path)
            .build()
            .map_err(|e| ExtractError::engine(Self::NAME, format!("model load: {}", e)))?;

        let results = engine
            .run_from_image(&image)
            .map_err(|e| ExtractError::engine(Self::NAME, e))?;

        let mut lines: Vec<RecognizedLine> = results
            .iter()
            .map(|r| {
                let (x, y) = r
                    .bounding_box
                    .exterior()
                    .coords()
                    .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)));
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                RecognizedLine {
                    x,
                    y,
                    text,
                    confidence: r.confidence,
                }
            })
            .collect();

        // Sort by reading order
        lines.sort_by(|a, b| {
            let row_a = (a.y / Self::ROW_HEIGHT) as i64;
            let row_b = (b.y / Self::ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
        };

        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            "OCR complete: {} lines, confidence {:.2} in {}ms",
            lines.len(),
            confidence,
            start.elapsed().as_millis()
        );

        Ok(ExtractionResult::new(&text, ExtractionMethod::LayoutOcr).with_confidence(confidence))
    }

    #[cfg(not(feature = "native"))]
    fn recognize(&self, _path: &Path) -> Result<ExtractionResult, ExtractError> {
        Err(ExtractError::engine(
            Self::NAME,
            format!("built without the native feature (models at {})", self.det_path.display()),
        ))
    }
}

impl ExtractionStrategy for LayoutOcrEngine {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::LayoutOcr
    }

    fn extract(&self, path: &Path) -> Result<ExtractionResult, EngineFailure> {
        Ok(self.recognize(path)?)
    }
}

/// Fallback OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractEngine {
    const NAME: &'static str = "tesseract";

    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_binary.clone(), config.language.clone())
    }
}

impl ExtractionStrategy for TesseractEngine {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Tesseract
    }

    fn extract(&self, path: &Path) -> Result<ExtractionResult, EngineFailure> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| ExtractError::engine(Self::NAME, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::engine(
                Self::NAME,
                format!("{}: {}", output.status, stderr.trim()),
            )
            .into());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        debug!("tesseract returned {} chars", text.len());

        Ok(ExtractionResult::new(&text, self.method()).with_confidence(TESSERACT_CONFIDENCE))
    }
}
