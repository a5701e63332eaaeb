//! Core library for personal-finance receipt ingestion.
//!
//! This crate provides:
//! - Text extraction from PDFs and receipt photos, with engine fallback
//! - Heuristic receipt field parsing (date, total, merchant, currency, tax, line items)
//! - Rule-based transaction categorization with a keyword fallback
//! - SQLite persistence for documents, transactions, and rules
//! - An ingestion pipeline with a worker queue, retries, and notifications

pub mod categorize;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod receipt;
pub mod store;

pub use categorize::{bulk_categorize, BulkOutcome, CategorySource, Categorizer};
pub use error::{ExtractError, FinscanError, QueueError, Result, StoreError, UploadError};
pub use extract::{ExtractionMethod, ExtractionResult, TextExtraction, TextExtractor};
pub use ingest::{DocumentEvent, Ingestor, Job, Orchestrator, Pipeline, RunOutcome, UploadRequest};
pub use models::config::FinscanConfig;
pub use models::document::{DocumentStatus, MediaType, UploadedDocument};
pub use models::ledger::{CategorizationRule, Category, NewRule, RuleField, Transaction, User};
pub use models::receipt::{LineItemCandidate, ParsedFields};
pub use receipt::{parse_document_data, ReceiptParser};
pub use store::Store;
