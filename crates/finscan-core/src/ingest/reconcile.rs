//! Sweep for documents stranded in `processing` by a crashed run.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::Store;

/// Fail every document that has been `processing` for longer than `stale_after`.
///
/// Returns the ids that were moved to `failed`. They are not re-queued.
pub fn reconcile_stale(store: &Store, stale_after: Duration) -> Result<Vec<i64>, StoreError> {
    let Ok(stale_after) = chrono::Duration::from_std(stale_after) else {
        debug!("Staleness window {:?} is out of range, nothing to reconcile", stale_after);
        return Ok(Vec::new());
    };
    let cutoff = Utc::now() - stale_after;
    let message = format!(
        "processing abandoned: no result after {} seconds",
        stale_after.num_seconds()
    );

    let mut failed = Vec::new();
    for document in store.list_stale_processing(cutoff)? {
        if store.fail_if_processing(document.id, &message)? {
            warn!(
                "Document {} was stuck in processing since {:?}, marked failed",
                document.id, document.processing_started_at
            );
            failed.push(document.id);
        }
    }

    debug!("Reconciled {} stale documents", failed.len());
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::orchestrator::tests::queued_document;
    use crate::models::document::DocumentStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_old_processing_documents_fail() {
        let store = Store::open_in_memory().unwrap();
        let user = store.create_user("a@example.com", "A").unwrap();
        let stuck = queued_document(&store, user.id);
        let waiting = queued_document(&store, user.id);
        store.claim_document(stuck).unwrap();

        assert!(reconcile_stale(&store, Duration::from_secs(3600)).unwrap().is_empty());

        let failed = reconcile_stale(&store, Duration::ZERO).unwrap();
        assert_eq!(failed, vec![stuck]);

        let doc = store.get_document(stuck).unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert!(doc.error_message.unwrap().starts_with("processing abandoned"));
        assert_eq!(
            store.get_document(waiting).unwrap().unwrap().status,
            DocumentStatus::Queued
        );
    }
}
