//! Transactions and line items.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{decimal_column, optional_decimal_column, Store};
use crate::error::StoreError;
use crate::models::ledger::{LineItem, Transaction, TransactionCandidate};

const TRANSACTION_COLUMNS: &str = "id, user_id, document_id, category_id, date, amount, currency,
     merchant, description, tax, is_expense, created_at";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        document_id: row.get(2)?,
        category_id: row.get(3)?,
        date: row.get(4)?,
        amount: decimal_column(row, 5)?,
        currency: row.get(6)?,
        merchant: row.get(7)?,
        description: row.get(8)?,
        tax: optional_decimal_column(row, 9)?,
        is_expense: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn line_item_from_row(row: &Row<'_>) -> rusqlite::Result<LineItem> {
    Ok(LineItem {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        name: row.get(2)?,
        quantity: decimal_column(row, 3)?,
        unit_price: decimal_column(row, 4)?,
        total_price: decimal_column(row, 5)?,
    })
}

impl Store {
    /// Write a transaction and its line items atomically.
    ///
    /// Fails with a constraint error if another transaction already links
    /// the same document.
    pub fn insert_transaction(&self, candidate: &TransactionCandidate) -> Result<Transaction, StoreError> {
        let created_at = Utc::now();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO transactions (user_id, document_id, category_id, date, amount, currency,
                 merchant, description, tax, is_expense, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    candidate.user_id,
                    candidate.document_id,
                    candidate.category_id,
                    candidate.date,
                    candidate.amount.to_string(),
                    candidate.currency,
                    candidate.merchant,
                    candidate.description,
                    candidate.tax.map(|t| t.to_string()),
                    candidate.is_expense,
                    created_at,
                ],
            )?;
            let id = tx.last_insert_rowid();

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO line_items (transaction_id, name, quantity, unit_price, total_price)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for item in &candidate.line_items {
                    stmt.execute(params![
                        id,
                        item.name,
                        item.quantity.to_string(),
                        item.unit_price.to_string(),
                        item.total_price.to_string(),
                    ])?;
                }
            }
            tx.commit()?;

            Ok(Transaction {
                id,
                user_id: candidate.user_id,
                document_id: candidate.document_id,
                category_id: candidate.category_id,
                date: candidate.date,
                amount: candidate.amount,
                currency: candidate.currency.clone(),
                merchant: candidate.merchant.clone(),
                description: candidate.description.clone(),
                tax: candidate.tax,
                is_expense: candidate.is_expense,
                created_at,
            })
        })
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
            Ok(conn.query_row(&sql, params![id], transaction_from_row).optional()?)
        })
    }

    /// The transaction auto-created from `document_id`, if any.
    pub fn find_transaction_by_document(&self, document_id: i64) -> Result<Option<Transaction>, StoreError> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE document_id = ?1");
            Ok(conn
                .query_row(&sql, params![document_id], transaction_from_row)
                .optional()?)
        })
    }

    /// A user's transactions in insertion order.
    pub fn list_transactions(
        &self,
        user_id: i64,
        only_uncategorized: bool,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.with_conn(|conn| {
            let filter = if only_uncategorized {
                " AND category_id IS NULL"
            } else {
                ""
            };
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = ?1{filter} ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let transactions = stmt
                .query_map(params![user_id], transaction_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(transactions)
        })
    }

    pub fn set_transaction_category(&self, id: i64, category_id: Option<i64>) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
                params![category_id, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: "transaction",
                    id,
                });
            }
            Ok(())
        })
    }

    pub fn list_line_items(&self, transaction_id: i64) -> Result<Vec<LineItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, transaction_id, name, quantity, unit_price, total_price
                 FROM line_items WHERE transaction_id = ?1 ORDER BY id",
            )?;
            let items = stmt
                .query_map(params![transaction_id], line_item_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }
}
