//! PDF text extraction using lopdf and pdf-extract.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, trace};

use super::tables::detect_tables;
use super::{EngineFailure, ExtractionMethod, ExtractionResult, ExtractionStrategy};
use crate::error::ExtractError;

/// Separates pages in the joined text.
const PAGE_BREAK: &str = "\n\u{c}";

fn read_file(engine: &'static str, path: &Path) -> Result<Vec<u8>, ExtractError> {
    std::fs::read(path).map_err(|e| ExtractError::engine(engine, e))
}

/// Per-page extraction with lopdf, including table detection.
#[derive(Debug, Default)]
pub struct StructuredPdfEngine;

impl StructuredPdfEngine {
    const NAME: &'static str = "lopdf";

    pub fn new() -> Self {
        Self
    }

    fn load(&self, data: &[u8]) -> Result<Document, ExtractError> {
        let mut doc = Document::load_mem(data).map_err(|e| ExtractError::engine(Self::NAME, e))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| ExtractError::engine(Self::NAME, format!("encrypted PDF: {}", e)))?;
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }
}

impl ExtractionStrategy for StructuredPdfEngine {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfStructured
    }

    fn extract(&self, path: &Path) -> Result<ExtractionResult, EngineFailure> {
        let data = read_file(Self::NAME, path)?;
        let doc = self.load(&data)?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(ExtractError::engine(Self::NAME, "PDF has no pages").into());
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut tables = Vec::new();

        for page_num in page_numbers {
            let page_text = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    return Err(EngineFailure::with_tables(
                        ExtractError::engine(Self::NAME, format!("page {}: {}", page_num, e)),
                        tables,
                    ));
                }
            };

            let page_tables = detect_tables(&page_text);
            trace!("Page {}: {} chars, {} tables", page_num, page_text.len(), page_tables.len());
            tables.extend(page_tables);
            pages.push(page_text);
        }

        debug!("Extracted {} pages with lopdf, {} tables", pages.len(), tables.len());

        Ok(ExtractionResult::new(&pages.join(PAGE_BREAK), self.method()).with_tables(tables))
    }
}

/// Whole-document text with pdf-extract. No tables.
#[derive(Debug, Default)]
pub struct PlainPdfEngine;

impl PlainPdfEngine {
    const NAME: &'static str = "pdf-extract";

    pub fn new() -> Self {
        Self
    }
}

impl ExtractionStrategy for PlainPdfEngine {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfPlain
    }

    fn extract(&self, path: &Path) -> Result<ExtractionResult, EngineFailure> {
        let data = read_file(Self::NAME, path)?;
        let text = pdf_extract::extract_text_from_mem(&data)
            .map_err(|e| ExtractError::engine(Self::NAME, e))?;

        debug!("Extracted {} chars with pdf-extract", text.len());
        Ok(ExtractionResult::new(&text, self.method()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_fails_both_engines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let structured = StructuredPdfEngine::new().extract(&path).unwrap_err();
        assert!(structured.salvaged_tables.is_empty());
        assert!(structured.error.to_string().starts_with("lopdf failed"));

        let plain = PlainPdfEngine::new().extract(&path).unwrap_err();
        assert!(plain.error.to_string().starts_with("pdf-extract failed"));
    }

    #[test]
    fn test_unreadable_file() {
        let failure = PlainPdfEngine::new().extract(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(failure.error.is_retryable());
    }
}
