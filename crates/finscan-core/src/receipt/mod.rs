//! Receipt field extraction module.

mod parser;
pub mod rules;

pub use parser::{parse_document_data, ReceiptParser};
