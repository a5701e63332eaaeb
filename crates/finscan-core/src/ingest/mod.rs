//! Document ingestion: upload, queue, process, retry, and notify.

pub mod events;
mod orchestrator;
mod queue;
mod reconcile;
mod upload;

pub use events::{DocumentEvent, EventHub, ProcessingStage};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use queue::{Job, JobSink, RetryPolicy, TaskQueue, WorkerPool};
pub use reconcile::reconcile_stale;
pub use upload::{Ingestor, UploadRequest};

use std::sync::Arc;

use crate::extract::TextExtraction;
use crate::models::config::FinscanConfig;
use crate::receipt::ReceiptParser;
use crate::store::Store;

/// A running ingestion pipeline wired from configuration.
///
/// Must be started inside a tokio runtime.
pub struct Pipeline {
    pub ingestor: Ingestor,
    pub queue: TaskQueue,
    pub events: Arc<EventHub>,
    workers: WorkerPool,
}

impl Pipeline {
    pub fn start(store: Arc<Store>, extractor: Arc<dyn TextExtraction>, config: &FinscanConfig) -> Self {
        let events = Arc::new(EventHub::new());
        let orchestrator = Orchestrator::new(
            store.clone(),
            extractor,
            ReceiptParser::from_config(&config.parser),
            events.clone(),
        )
        .with_error_message_limit(config.pipeline.error_message_limit);

        let (queue, workers) = TaskQueue::spawn(
            Arc::new(orchestrator),
            config.pipeline.workers,
            RetryPolicy::from_config(&config.pipeline),
        );
        let ingestor = Ingestor::new(store, Arc::new(queue.clone()), &config.storage);

        Self {
            ingestor,
            queue,
            events,
            workers,
        }
    }

    /// Wait for all queued work, including retries, to finish.
    pub async fn drain(&self) {
        self.queue.wait_idle().await;
    }

    /// Close the queue and wait for the workers to exit.
    pub async fn shutdown(self) {
        let Pipeline {
            ingestor,
            queue,
            workers,
            ..
        } = self;
        drop(ingestor);
        drop(queue);
        workers.join().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::DocumentStatus;
    use orchestrator::tests::{CannedExtractor, WALMART};
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_upload_to_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FinscanConfig::default();
        config.storage.upload_dir = dir.path().to_path_buf();
        config.pipeline.retry_backoff_secs = 0;

        let store = Arc::new(Store::open_in_memory().unwrap());
        let user = store.create_user("a@example.com", "A").unwrap();
        let pipeline = Pipeline::start(store.clone(), Arc::new(CannedExtractor::text(WALMART)), &config);
        let mut events = pipeline.events.subscribe(user.id);

        let doc = pipeline
            .ingestor
            .upload(UploadRequest {
                user_id: user.id,
                filename: "walmart.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.4".to_vec(),
            })
            .unwrap();
        pipeline.drain().await;

        let loaded = store.get_document(doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Processed);

        let tx = store.find_transaction_by_document(doc.id).unwrap().unwrap();
        assert_eq!(tx.amount.to_string(), "11.08");

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(DocumentEvent::DocumentProcessingCompleted {
                document_id: doc.id,
                transaction_id: Some(tx.id),
            })
        );

        pipeline.shutdown().await;
    }
}
