//! One pipeline run per document: extract, parse, categorize, persist.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::events::{DocumentEvent, EventHub, ProcessingStage};
use crate::categorize::Categorizer;
use crate::error::{ExtractError, Result, StoreError};
use crate::extract::{ExtractedTable, ExtractionMethod, TextExtraction};
use crate::models::config::PipelineConfig;
use crate::models::document::UploadedDocument;
use crate::models::ledger::TransactionCandidate;
use crate::models::receipt::{truncate_chars, ParsedFields};
use crate::receipt::ReceiptParser;
use crate::store::Store;

/// What a run did with its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The document reached `processed`.
    Processed { transaction_id: Option<i64> },
    /// The document was not claimable, usually because another run holds it.
    Skipped,
}

/// Stored in `documents.extracted_data`.
#[derive(Serialize)]
struct ExtractedData<'a> {
    #[serde(flatten)]
    fields: &'a ParsedFields,
    method: ExtractionMethod,
    confidence: Option<f32>,
    page_count: usize,
    tables: &'a [ExtractedTable],
}

pub struct Orchestrator {
    store: Arc<Store>,
    extractor: Arc<dyn TextExtraction>,
    parser: ReceiptParser,
    events: Arc<EventHub>,
    error_message_limit: usize,
}

impl Orchestrator {
    pub fn new(
        store: Arc<Store>,
        extractor: Arc<dyn TextExtraction>,
        parser: ReceiptParser,
        events: Arc<EventHub>,
    ) -> Self {
        Self {
            store,
            extractor,
            parser,
            events,
            error_message_limit: PipelineConfig::default().error_message_limit,
        }
    }

    pub fn with_error_message_limit(mut self, limit: usize) -> Self {
        self.error_message_limit = limit;
        self
    }

    /// Run the pipeline for `document_id`.
    ///
    /// On failure the document is left `failed` with a truncated error
    /// message and the error is returned so the caller can decide on a
    /// retry. `attempt` is zero for the first run.
    pub fn process_document(&self, document_id: i64, attempt: u32) -> Result<RunOutcome> {
        let Some(document) = self.store.get_document(document_id)? else {
            warn!("Document {} no longer exists", document_id);
            return Err(StoreError::NotFound {
                entity: "document",
                id: document_id,
            }
            .into());
        };

        if !self.store.claim_document(document_id)? {
            info!(
                "Skipping document {}: status is {}, not claimable",
                document_id, document.status
            );
            return Ok(RunOutcome::Skipped);
        }

        let start = Instant::now();
        info!("Processing document {} (attempt {})", document_id, attempt + 1);
        self.events.publish(
            document.user_id,
            DocumentEvent::DocumentProcessingStarted { document_id },
        );

        let result = self.run_pipeline(&document).and_then(|transaction_id| {
            self.store.mark_processed(document_id)?;
            Ok(transaction_id)
        });

        match result {
            Ok(transaction_id) => {
                info!(
                    "Processed document {} in {:?} (transaction {:?})",
                    document_id,
                    start.elapsed(),
                    transaction_id
                );
                self.events.publish(
                    document.user_id,
                    DocumentEvent::DocumentProcessingCompleted {
                        document_id,
                        transaction_id,
                    },
                );
                Ok(RunOutcome::Processed { transaction_id })
            }
            Err(e) => {
                let message = truncate_chars(&e.to_string(), self.error_message_limit);
                error!("Document {} failed: {}", document_id, message);
                if let Err(store_err) = self.store.mark_failed(document_id, &message) {
                    error!("Could not record failure of document {}: {}", document_id, store_err);
                }
                self.events.publish(
                    document.user_id,
                    DocumentEvent::DocumentProcessingFailed {
                        document_id,
                        error: message,
                        attempt,
                    },
                );
                Err(e)
            }
        }
    }

    fn progress(&self, document: &UploadedDocument, stage: ProcessingStage) {
        debug!("Document {}: {:?}", document.id, stage);
        self.events.publish(
            document.user_id,
            DocumentEvent::DocumentProcessingProgress {
                document_id: document.id,
                stage,
            },
        );
    }

    fn run_pipeline(&self, document: &UploadedDocument) -> Result<Option<i64>> {
        self.progress(document, ProcessingStage::Extracting);
        let extraction = self.extractor.extract(&document.file_path, &document.mime_type)?;
        self.store.record_raw_text(document.id, &extraction.raw_text)?;
        if extraction.is_empty() {
            return Err(ExtractError::NoTextExtracted.into());
        }

        self.progress(document, ProcessingStage::Parsing);
        let parsed = self.parser.parse(&extraction.raw_text);
        let data = ExtractedData {
            fields: &parsed,
            method: extraction.method,
            confidence: extraction.confidence,
            page_count: extraction.page_count,
            tables: &extraction.tables,
        };
        self.store
            .record_extracted_data(document.id, &serde_json::to_string(&data)?)?;

        let Some(mut candidate) =
            TransactionCandidate::from_parsed(&parsed, document.user_id, Some(document.id))
        else {
            info!(
                "Document {}: no amount or date found, not creating a transaction",
                document.id
            );
            return Ok(None);
        };

        if let Some(existing) = self.store.find_transaction_by_document(document.id)? {
            warn!(
                "Document {} already has transaction {}, reusing it",
                document.id, existing.id
            );
            return Ok(Some(existing.id));
        }

        self.progress(document, ProcessingStage::Categorizing);
        candidate.category_id =
            Categorizer::new(self.store.as_ref()).categorize(&candidate, document.user_id)?;

        self.progress(document, ProcessingStage::Saving);
        let transaction = self.store.insert_transaction(&candidate)?;
        info!(
            "Created transaction {} ({} {}) from document {}",
            transaction.id, transaction.amount, transaction.currency, document.id
        );

        Ok(Some(transaction.id))
    }
}
