//! Data models for documents, parsed receipts, and the ledger.

pub mod config;
pub mod document;
pub mod ledger;
pub mod receipt;
