//! Merchant name extraction.

use super::patterns::DIGITS_ONLY;
use crate::models::receipt::{truncate_chars, MAX_NAME_CHARS};

/// Only the top of a receipt is expected to carry the merchant name.
const MERCHANT_SCAN_LINES: usize = 5;

/// Lines containing any of these (case-insensitive) are headers or totals.
const SKIP_WORDS: [&str; 5] = ["receipt", "invoice", "tax", "total", "date"];

/// Return the first plausible merchant line among the first few lines.
pub fn extract_merchant(text: &str) -> Option<String> {
    text.split('\n')
        .take(MERCHANT_SCAN_LINES)
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            !SKIP_WORDS.iter().any(|word| lower.contains(word))
        })
        .find(|line| !line.is_empty() && !DIGITS_ONLY.is_match(line))
        .map(|line| truncate_chars(line, MAX_NAME_CHARS))
}
