//! Upload boundary: accept files, create documents, and queue them.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::queue::{Job, JobSink};
use crate::error::{StoreError, UploadError};
use crate::models::config::StorageConfig;
use crate::models::document::{DocumentStatus, MediaType, NewDocument, UploadedDocument};
use crate::store::Store;

/// A file handed to [`Ingestor::upload`].
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: i64,
    /// Original file name, kept for display.
    pub filename: String,
    /// Declared MIME type.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Creates, requeues, and removes documents.
pub struct Ingestor {
    store: Arc<Store>,
    sink: Arc<dyn JobSink>,
    upload_dir: PathBuf,
    max_upload_size: u64,
}

impl Ingestor {
    pub fn new(store: Arc<Store>, sink: Arc<dyn JobSink>, config: &StorageConfig) -> Self {
        Self {
            store,
            sink,
            upload_dir: config.upload_dir.clone(),
            max_upload_size: config.max_upload_size,
        }
    }

    /// Store the file, create its document, and queue it for processing.
    ///
    /// A queue failure is logged and leaves the document `uploaded`; the
    /// upload itself still succeeds.
    pub fn upload(&self, request: UploadRequest) -> Result<UploadedDocument, UploadError> {
        let media_type = MediaType::from_mime(&request.mime_type)
            .ok_or_else(|| UploadError::UnsupportedMediaType(request.mime_type.clone()))?;

        let size = request.bytes.len() as u64;
        if size > self.max_upload_size {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_upload_size,
            });
        }

        fs::create_dir_all(&self.upload_dir)?;
        let file_path = self
            .upload_dir
            .join(format!("{}.{}", Uuid::new_v4(), media_type.extension()));
        fs::write(&file_path, &request.bytes)?;
        debug!("Saved {} ({} bytes) to {}", request.filename, size, file_path.display());

        let inserted = self.store.insert_document(&NewDocument {
            user_id: request.user_id,
            filename: request.filename,
            file_path: file_path.clone(),
            mime_type: request.mime_type,
            file_size: size,
        });
        let mut document = match inserted {
            Ok(document) => document,
            Err(e) => {
                if let Err(io) = fs::remove_file(&file_path) {
                    warn!("Could not remove orphaned upload {}: {}", file_path.display(), io);
                }
                return Err(e.into());
            }
        };

        // Queued before submission so a fast worker can claim it.
        self.store.set_document_status(document.id, DocumentStatus::Queued)?;
        match self.sink.submit(Job::new(document.id)) {
            Ok(()) => {
                document.status = DocumentStatus::Queued;
                info!("Uploaded document {} ({}) and queued it", document.id, document.filename);
            }
            Err(e) => {
                warn!(
                    "Could not queue document {}: {}; it stays uploaded until reprocessed",
                    document.id, e
                );
                self.store.set_document_status(document.id, DocumentStatus::Uploaded)?;
            }
        }

        Ok(document)
    }

    /// Queue one of the user's documents again.
    ///
    /// Fails with `AlreadyProcessing` while a run holds the document. If
    /// submission fails the previous status and error are put back.
    pub fn reprocess(&self, user_id: i64, document_id: i64) -> Result<UploadedDocument, UploadError> {
        let document = self.owned_document(user_id, document_id)?;
        if document.status == DocumentStatus::Processing {
            return Err(UploadError::AlreadyProcessing(document_id));
        }

        if !self.store.requeue_document(document_id)? {
            return Err(UploadError::AlreadyProcessing(document_id));
        }

        if let Err(e) = self.sink.submit(Job::new(document_id)) {
            warn!("Could not queue document {} for reprocessing: {}", document_id, e);
            self.store.restore_document(
                document_id,
                document.status,
                document.error_message.as_deref(),
            )?;
            return Err(e.into());
        }

        info!("Document {} queued for reprocessing (was {})", document_id, document.status);
        Ok(UploadedDocument {
            status: DocumentStatus::Queued,
            error_message: None,
            ..document
        })
    }

    /// Remove a document and its stored file.
    ///
    /// A file that cannot be removed is logged and left behind.
    pub fn delete_document(&self, user_id: i64, document_id: i64) -> Result<(), UploadError> {
        let document = self.owned_document(user_id, document_id)?;

        match fs::remove_file(&document.file_path) {
            Ok(()) => debug!("Removed {}", document.file_path.display()),
            Err(e) => warn!("Could not remove {}: {}", document.file_path.display(), e),
        }

        self.store.delete_document(document_id)?;
        info!("Deleted document {}", document_id);
        Ok(())
    }

    fn owned_document(&self, user_id: i64, document_id: i64) -> Result<UploadedDocument, UploadError> {
        self.store
            .get_document_for_user(user_id, document_id)?
            .ok_or(UploadError::Store(StoreError::NotFound {
                entity: "document",
                id: document_id,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        jobs: Mutex<Vec<Job>>,
    }

    impl JobSink for RecordingSink {
        fn submit(&self, job: Job) -> Result<(), QueueError> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    struct ClosedSink;

    impl JobSink for ClosedSink {
        fn submit(&self, _job: Job) -> Result<(), QueueError> {
            Err(QueueError::Closed)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<Store>,
        config: StorageConfig,
        user_id: i64,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_in_memory().unwrap());
        let user = store.create_user("a@example.com", "A").unwrap();
        let config = StorageConfig {
            upload_dir: dir.path().join("uploads"),
            max_upload_size: 1024,
            ..StorageConfig::default()
        };
        Fixture {
            _dir: dir,
            store,
            config,
            user_id: user.id,
        }
    }

    fn request(user_id: i64, mime_type: &str, size: usize) -> UploadRequest {
        UploadRequest {
            user_id,
            filename: "receipt.png".to_string(),
            mime_type: mime_type.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_upload_saves_file_and_queues() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());
        let ingestor = Ingestor::new(f.store.clone(), sink.clone(), &f.config);

        let doc = ingestor.upload(request(f.user_id, "image/jpg", 100)).unwrap();

        assert_eq!(doc.status, DocumentStatus::Queued);
        assert_eq!(doc.file_size, 100);
        assert!(doc.file_path.exists());
        assert_eq!(doc.file_path.extension().unwrap(), "jpg");
        assert_eq!(*sink.jobs.lock().unwrap(), vec![Job::new(doc.id)]);
        assert_eq!(
            f.store.get_document(doc.id).unwrap().unwrap().status,
            DocumentStatus::Queued
        );
    }

    #[test]
    fn test_upload_rejects_bad_type_and_size() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(RecordingSink::default()), &f.config);

        assert!(matches!(
            ingestor.upload(request(f.user_id, "image/gif", 10)),
            Err(UploadError::UnsupportedMediaType(m)) if m == "image/gif"
        ));
        assert!(matches!(
            ingestor.upload(request(f.user_id, "image/png", 1025)),
            Err(UploadError::TooLarge { size: 1025, max: 1024 })
        ));
        assert!(f.store.list_documents(f.user_id).unwrap().is_empty());
    }

    #[test]
    fn test_queue_failure_leaves_document_uploaded() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(ClosedSink), &f.config);

        let doc = ingestor.upload(request(f.user_id, "application/pdf", 10)).unwrap();

        assert_eq!(doc.status, DocumentStatus::Uploaded);
        assert_eq!(
            f.store.get_document(doc.id).unwrap().unwrap().status,
            DocumentStatus::Uploaded
        );
    }

    #[test]
    fn test_reprocess_failed_document() {
        let f = fixture();
        let sink = Arc::new(RecordingSink::default());
        let ingestor = Ingestor::new(f.store.clone(), sink.clone(), &f.config);
        let doc = ingestor.upload(request(f.user_id, "image/png", 10)).unwrap();
        f.store.claim_document(doc.id).unwrap();
        f.store.mark_failed(doc.id, "ocr failed").unwrap();

        let requeued = ingestor.reprocess(f.user_id, doc.id).unwrap();

        assert_eq!(requeued.status, DocumentStatus::Queued);
        assert_eq!(requeued.error_message, None);
        assert_eq!(sink.jobs.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_reprocess_rejects_processing_and_foreign_documents() {
        let f = fixture();
        let other = f.store.create_user("b@example.com", "B").unwrap();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(RecordingSink::default()), &f.config);
        let doc = ingestor.upload(request(f.user_id, "image/png", 10)).unwrap();

        assert!(matches!(
            ingestor.reprocess(other.id, doc.id),
            Err(UploadError::Store(StoreError::NotFound { .. }))
        ));

        f.store.claim_document(doc.id).unwrap();
        assert!(matches!(
            ingestor.reprocess(f.user_id, doc.id),
            Err(UploadError::AlreadyProcessing(id)) if id == doc.id
        ));
    }

    #[test]
    fn test_reprocess_submit_failure_restores_state() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(ClosedSink), &f.config);
        let doc = ingestor.upload(request(f.user_id, "image/png", 10)).unwrap();
        f.store.set_document_status(doc.id, DocumentStatus::Queued).unwrap();
        f.store.claim_document(doc.id).unwrap();
        f.store.mark_failed(doc.id, "ocr failed").unwrap();

        assert!(matches!(
            ingestor.reprocess(f.user_id, doc.id),
            Err(UploadError::Enqueue(QueueError::Closed))
        ));

        let loaded = f.store.get_document(doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("ocr failed"));
    }

    #[test]
    fn test_delete_removes_file_and_row() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(RecordingSink::default()), &f.config);
        let doc = ingestor.upload(request(f.user_id, "image/png", 10)).unwrap();

        ingestor.delete_document(f.user_id, doc.id).unwrap();

        assert!(!doc.file_path.exists());
        assert!(f.store.get_document(doc.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_tolerates_missing_file() {
        let f = fixture();
        let ingestor = Ingestor::new(f.store.clone(), Arc::new(RecordingSink::default()), &f.config);
        let doc = ingestor.upload(request(f.user_id, "image/png", 10)).unwrap();
        std::fs::remove_file(&doc.file_path).unwrap();

        assert!(ingestor.delete_document(f.user_id, doc.id).is_ok());
    }
}
