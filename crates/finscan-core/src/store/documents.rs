//! Document rows and status transitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::Store;
use crate::error::StoreError;
use crate::models::document::{DocumentStatus, NewDocument, UploadedDocument};

const DOCUMENT_COLUMNS: &str = "id, user_id, filename, file_path, mime_type, file_size, status,
     error_message, raw_text, extracted_data, created_at, processing_started_at, processed_at";

/// Raw column values before the status string is validated.
struct DocumentRow {
    id: i64,
    user_id: i64,
    filename: String,
    file_path: String,
    mime_type: String,
    file_size: i64,
    status: String,
    error_message: Option<String>,
    raw_text: Option<String>,
    extracted_data: Option<String>,
    created_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        filename: row.get(2)?,
        file_path: row.get(3)?,
        mime_type: row.get(4)?,
        file_size: row.get(5)?,
        status: row.get(6)?,
        error_message: row.get(7)?,
        raw_text: row.get(8)?,
        extracted_data: row.get(9)?,
        created_at: row.get(10)?,
        processing_started_at: row.get(11)?,
        processed_at: row.get(12)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<UploadedDocument, StoreError> {
    let status = row
        .status
        .parse::<DocumentStatus>()
        .map_err(|_| StoreError::InvalidEnum {
            field: "documents.status",
            value: row.status.clone(),
        })?;

    Ok(UploadedDocument {
        id: row.id,
        user_id: row.user_id,
        filename: row.filename,
        file_path: PathBuf::from(row.file_path),
        mime_type: row.mime_type,
        file_size: row.file_size.max(0) as u64,
        status,
        error_message: row.error_message,
        raw_text: row.raw_text,
        extracted_data: row.extracted_data,
        created_at: row.created_at,
        processing_started_at: row.processing_started_at,
        processed_at: row.processed_at,
    })
}

fn expect_changed(changed: usize, id: i64) -> Result<(), StoreError> {
    if changed == 0 {
        return Err(StoreError::NotFound {
            entity: "document",
            id,
        });
    }
    Ok(())
}

impl Store {
    /// Create a document row in `uploaded`.
    pub fn insert_document(&self, doc: &NewDocument) -> Result<UploadedDocument, StoreError> {
        let created_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (user_id, filename, file_path, mime_type, file_size, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    doc.user_id,
                    doc.filename,
                    doc.file_path.to_string_lossy(),
                    doc.mime_type,
                    doc.file_size as i64,
                    DocumentStatus::Uploaded.as_str(),
                    created_at,
                ],
            )?;

            Ok(UploadedDocument {
                id: conn.last_insert_rowid(),
                user_id: doc.user_id,
                filename: doc.filename.clone(),
                file_path: doc.file_path.clone(),
                mime_type: doc.mime_type.clone(),
                file_size: doc.file_size,
                status: DocumentStatus::Uploaded,
                error_message: None,
                raw_text: None,
                extracted_data: None,
                created_at,
                processing_started_at: None,
                processed_at: None,
            })
        })
    }

    pub fn get_document(&self, id: i64) -> Result<Option<UploadedDocument>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1");
            let row = conn.query_row(&sql, params![id], read_row).optional()?;
            row.map(document_from_row).transpose()
        })
    }

    /// A document, only if `user_id` owns it.
    pub fn get_document_for_user(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<UploadedDocument>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1 AND user_id = ?2");
            let row = conn.query_row(&sql, params![id, user_id], read_row).optional()?;
            row.map(document_from_row).transpose()
        })
    }

    /// All of a user's documents, newest first.
    pub fn list_documents(&self, user_id: i64) -> Result<Vec<UploadedDocument>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = ?1 ORDER BY id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id], read_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(document_from_row).collect()
        })
    }

    pub fn set_document_status(&self, id: i64, status: DocumentStatus) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?;
            expect_changed(changed, id)
        })
    }

    /// Move a document into `processing` if it is `queued` or `failed`.
    ///
    /// Returns `false` when another run holds it or it is in any other state.
    pub fn claim_document(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, processing_started_at = ?2
                 WHERE id = ?3 AND status IN (?4, ?5)",
                params![
                    DocumentStatus::Processing.as_str(),
                    Utc::now(),
                    id,
                    DocumentStatus::CLAIMABLE[0].as_str(),
                    DocumentStatus::CLAIMABLE[1].as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Queue a document again and clear its error, unless it is being processed.
    pub fn requeue_document(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, error_message = NULL
                 WHERE id = ?2 AND status != ?3",
                params![
                    DocumentStatus::Queued.as_str(),
                    id,
                    DocumentStatus::Processing.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Put back a status and error message captured before a requeue.
    pub fn restore_document(
        &self,
        id: i64,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, error_message = ?2 WHERE id = ?3",
                params![status.as_str(), error_message, id],
            )?;
            expect_changed(changed, id)
        })
    }

    pub fn record_raw_text(&self, id: i64, raw_text: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET raw_text = ?1 WHERE id = ?2",
                params![raw_text, id],
            )?;
            expect_changed(changed, id)
        })
    }

    pub fn record_extracted_data(&self, id: i64, json: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET extracted_data = ?1 WHERE id = ?2",
                params![json, id],
            )?;
            expect_changed(changed, id)
        })
    }

    pub fn mark_processed(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, processed_at = ?2, error_message = NULL
                 WHERE id = ?3",
                params![DocumentStatus::Processed.as_str(), Utc::now(), id],
            )?;
            expect_changed(changed, id)
        })
    }

    pub fn mark_failed(&self, id: i64, error_message: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, error_message = ?2 WHERE id = ?3",
                params![DocumentStatus::Failed.as_str(), error_message, id],
            )?;
            expect_changed(changed, id)
        })
    }

    /// Fail a document only if it is still `processing`.
    pub fn fail_if_processing(&self, id: i64, error_message: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE documents SET status = ?1, error_message = ?2
                 WHERE id = ?3 AND status = ?4",
                params![
                    DocumentStatus::Failed.as_str(),
                    error_message,
                    id,
                    DocumentStatus::Processing.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Documents in `processing` that started before `cutoff` or never recorded a start.
    pub fn list_stale_processing(&self, cutoff: DateTime<Utc>) -> Result<Vec<UploadedDocument>, StoreError> {
        let processing = self.with_conn(|conn| {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE status = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![DocumentStatus::Processing.as_str()], read_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(document_from_row).collect::<Result<Vec<_>, _>>()
        })?;

        Ok(processing
            .into_iter()
            .filter(|doc| doc.processing_started_at.is_none_or(|started| started < cutoff))
            .collect())
    }

    /// Delete a document row. Its transaction, if any, is kept and unlinked.
    pub fn delete_document(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
            Ok(changed == 1)
        })
    }
}
