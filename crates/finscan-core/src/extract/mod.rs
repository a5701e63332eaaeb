//! Text extraction from stored documents.
//!
//! Each media category owns a [`FallbackChain`] of two strategies. The
//! primary strategy's failure is logged and swallowed; only a failure of
//! the fallback reaches the caller.

mod ocr;
mod pdf;
mod tables;

pub use ocr::{LayoutOcrEngine, TesseractEngine, TESSERACT_CONFIDENCE};
pub use pdf::{PlainPdfEngine, StructuredPdfEngine};
pub use tables::{detect_tables, is_tabular_line};

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ExtractError;
use crate::models::config::OcrConfig;
use crate::models::document::MediaType;

/// Rows of cells.
pub type ExtractedTable = Vec<Vec<String>>;

/// Which engine produced an [`ExtractionResult`].
///
/// This tag, not the confidence value, identifies the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PdfStructured,
    PdfPlain,
    LayoutOcr,
    Tesseract,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::PdfStructured => "pdf_structured",
            ExtractionMethod::PdfPlain => "pdf_plain",
            ExtractionMethod::LayoutOcr => "layout_ocr",
            ExtractionMethod::Tesseract => "tesseract",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a text extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted text, trimmed.
    pub raw_text: String,

    /// Tables found by the engine (structured PDF only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<ExtractedTable>,

    /// Engine confidence in `[0, 1]`, when the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    pub method: ExtractionMethod,

    /// Form feeds plus one, or zero for empty text.
    pub page_count: usize,
}

impl ExtractionResult {
    pub fn new(text: &str, method: ExtractionMethod) -> Self {
        let page_count = if text.is_empty() {
            0
        } else {
            text.matches('\u{c}').count() + 1
        };

        Self {
            raw_text: text.trim().to_string(),
            tables: Vec::new(),
            confidence: None,
            method,
            page_count,
        }
    }

    pub fn with_tables(mut self, tables: Vec<ExtractedTable>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.is_empty()
    }
}

/// A failed engine run, with any tables recovered before the failure.
#[derive(Debug)]
pub struct EngineFailure {
    pub error: ExtractError,
    pub salvaged_tables: Vec<ExtractedTable>,
}

impl EngineFailure {
    pub fn with_tables(error: ExtractError, salvaged_tables: Vec<ExtractedTable>) -> Self {
        Self {
            error,
            salvaged_tables,
        }
    }
}

impl From<ExtractError> for EngineFailure {
    fn from(error: ExtractError) -> Self {
        Self::with_tables(error, Vec::new())
    }
}

/// One way of turning a file into text.
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn extract(&self, path: &Path) -> Result<ExtractionResult, EngineFailure>;
}

/// Primary strategy with a single fallback.
pub struct FallbackChain {
    primary: Box<dyn ExtractionStrategy>,
    fallback: Box<dyn ExtractionStrategy>,
}

impl FallbackChain {
    pub fn new(primary: Box<dyn ExtractionStrategy>, fallback: Box<dyn ExtractionStrategy>) -> Self {
        Self { primary, fallback }
    }

    /// Run the primary strategy, then the fallback if it failed.
    ///
    /// Tables the primary recovered before failing are kept when the
    /// fallback produces none of its own.
    pub fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractError> {
        let failure = match self.primary.extract(path) {
            Ok(result) => return Ok(result),
            Err(failure) => failure,
        };

        warn!(
            "{} extraction failed: {}, trying {}",
            self.primary.method(),
            failure.error,
            self.fallback.method()
        );

        let mut result = self.fallback.extract(path).map_err(|f| f.error)?;
        if result.tables.is_empty() && !failure.salvaged_tables.is_empty() {
            debug!("Keeping {} tables from {}", failure.salvaged_tables.len(), self.primary.method());
            result.tables = failure.salvaged_tables;
        }

        Ok(result)
    }
}

/// Extracts text from a stored document given its declared MIME type.
pub trait TextExtraction: Send + Sync {
    fn extract(&self, path: &Path, mime_type: &str) -> Result<ExtractionResult, ExtractError>;
}

/// Dispatches on media type to the PDF or image chain.
pub struct TextExtractor {
    pdf: FallbackChain,
    image: FallbackChain,
}

impl TextExtractor {
    pub fn new(pdf: FallbackChain, image: FallbackChain) -> Self {
        Self { pdf, image }
    }

    /// Build the default engines: lopdf then pdf-extract for PDFs, layout
    /// OCR then tesseract for images.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            FallbackChain::new(Box::new(StructuredPdfEngine::new()), Box::new(PlainPdfEngine::new())),
            FallbackChain::new(
                Box::new(LayoutOcrEngine::from_config(config)),
                Box::new(TesseractEngine::from_config(config)),
            ),
        )
    }

    fn chain_for(&self, media_type: MediaType) -> &FallbackChain {
        match media_type {
            MediaType::Pdf => &self.pdf,
            MediaType::Jpeg | MediaType::Png => &self.image,
        }
    }
}

impl TextExtraction for TextExtractor {
    fn extract(&self, path: &Path, mime_type: &str) -> Result<ExtractionResult, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::FileNotFound(path.to_path_buf()));
        }

        let media_type = MediaType::from_mime(mime_type)
            .ok_or_else(|| ExtractError::UnsupportedMediaType(mime_type.to_string()))?;

        let result = self.chain_for(media_type).extract(path)?;
        info!(
            "Extracted {} chars from {} using {}",
            result.raw_text.len(),
            path.display(),
            result.method
        );

        Ok(result)
    }
}
