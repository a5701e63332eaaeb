//! Error types for the finscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the finscan library.
#[derive(Error, Debug)]
pub enum FinscanError {
    /// Text extraction error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Persistence error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Task queue error.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Upload boundary error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Serialization of extracted data failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FinscanError {
    /// Whether a pipeline run that failed with this error may be retried.
    ///
    /// Unsupported media types, missing files and missing rows fail
    /// identically on every attempt. Engine failures, empty OCR output and
    /// other storage errors are treated as transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            FinscanError::Extract(e) => e.is_retryable(),
            FinscanError::Store(StoreError::NotFound { .. }) => false,
            FinscanError::Upload(_) | FinscanError::Config(_) => false,
            _ => true,
        }
    }
}

/// Errors raised while turning a stored file into raw text.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The declared media type has no extraction strategy.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The referenced file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An extraction engine failed.
    #[error("{engine} failed: {reason}")]
    Engine { engine: &'static str, reason: String },

    /// Extraction succeeded but produced no text.
    #[error("no text extracted from document")]
    NoTextExtracted,
}

impl ExtractError {
    pub fn engine(engine: &'static str, reason: impl ToString) -> Self {
        ExtractError::Engine {
            engine,
            reason: reason.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ExtractError::UnsupportedMediaType(_) | ExtractError::FileNotFound(_)
        )
    }
}

/// Errors related to the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("invalid value for {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("database connection lock poisoned")]
    LockPoisoned,
}

/// Errors related to submitting work to the task queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The worker side of the queue has shut down.
    #[error("task queue is closed")]
    Closed,
}

/// Errors raised at the upload boundary.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("unsupported file type {0}; allowed: application/pdf, image/jpeg, image/jpg, image/png")]
    UnsupportedMediaType(String),

    #[error("file too large: {size} bytes (maximum {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("document {0} is currently being processed")]
    AlreadyProcessing(i64),

    #[error("failed to queue document: {0}")]
    Enqueue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to save file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the finscan library.
pub type Result<T> = std::result::Result<T, FinscanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_extraction_failures_are_not_retryable() {
        let missing: FinscanError = ExtractError::FileNotFound(PathBuf::from("/nope.pdf")).into();
        let unsupported: FinscanError =
            ExtractError::UnsupportedMediaType("text/plain".to_string()).into();

        assert!(!missing.is_retryable());
        assert!(!unsupported.is_retryable());
    }

    #[test]
    fn test_transient_failures_are_retryable() {
        let empty: FinscanError = ExtractError::NoTextExtracted.into();
        let engine: FinscanError = ExtractError::engine("tesseract", "exit status 1").into();

        assert!(empty.is_retryable());
        assert!(engine.is_retryable());
        assert_eq!(engine.to_string(), "extraction error: tesseract failed: exit status 1");
    }
}
