//! Best-effort per-user processing notifications.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Buffered events per user before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Pipeline stage reported in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Extracting,
    Parsing,
    Categorizing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentEvent {
    DocumentProcessingStarted {
        document_id: i64,
    },
    DocumentProcessingProgress {
        document_id: i64,
        stage: ProcessingStage,
    },
    DocumentProcessingCompleted {
        document_id: i64,
        transaction_id: Option<i64>,
    },
    DocumentProcessingFailed {
        document_id: i64,
        error: String,
        attempt: u32,
    },
}

impl DocumentEvent {
    pub fn document_id(&self) -> i64 {
        match self {
            DocumentEvent::DocumentProcessingStarted { document_id }
            | DocumentEvent::DocumentProcessingProgress { document_id, .. }
            | DocumentEvent::DocumentProcessingCompleted { document_id, .. }
            | DocumentEvent::DocumentProcessingFailed { document_id, .. } => *document_id,
        }
    }
}

/// Per-user broadcast channels. Events nobody listens to are dropped.
#[derive(Default)]
pub struct EventHub {
    channels: Mutex<HashMap<i64, broadcast::Sender<DocumentEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: i64) -> broadcast::Receiver<DocumentEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, user_id: i64, event: DocumentEvent) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = channels.get(&user_id) else {
            trace!("No subscribers for user {}, dropping {:?}", user_id, event);
            return;
        };

        if sender.send(event).is_err() {
            // Every receiver is gone.
            channels.remove(&user_id);
        }
    }
}
