//! Amount extraction for receipts.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use super::patterns::{AMOUNT_BARE, AMOUNT_WITH_SYMBOL, COMMA_DECIMAL_TAIL};
use super::{ExtractionMatch, FieldExtractor};

/// Candidates at or above this are treated as receipt or invoice numbers.
pub const MAX_PLAUSIBLE_AMOUNT: i64 = 1_000_000;

/// Amount field extractor.
///
/// Amounts preceded by a currency symbol are preferred; bare two-decimal
/// numbers are only considered when no symbol-prefixed amount exists at
/// all. The largest remaining candidate is taken as the grand total.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text)
            .into_iter()
            .max_by(|a, b| a.value.cmp(&b.value))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let pattern = if AMOUNT_WITH_SYMBOL.is_match(text) {
            &*AMOUNT_WITH_SYMBOL
        } else {
            &*AMOUNT_BARE
        };

        let limit = Decimal::from(MAX_PLAUSIBLE_AMOUNT);
        let mut results = Vec::new();

        for caps in pattern.captures_iter(text) {
            let Some(group) = caps.get(1) else { continue };

            match normalize_amount(group.as_str()) {
                Some(amount) if amount < limit => {
                    results.push(
                        ExtractionMatch::new(amount, group.as_str())
                            .with_position(group.start(), group.end()),
                    );
                }
                Some(amount) => trace!("Discarding implausible amount {}", amount),
                None => trace!("Could not normalize amount {:?}", group.as_str()),
            }
        }

        results
    }
}

/// Normalize a matched amount and parse it.
///
/// Spaces are dropped first; any other whitespace makes the candidate invalid.
/// With both `.` and `,` present, commas are thousands separators. A lone
/// comma followed by exactly two trailing digits is the decimal separator;
/// any other comma is a thousands separator.
pub fn normalize_amount(s: &str) -> Option<Decimal> {
    let cleaned = s.replace(' ', "");

    let normalized = if cleaned.contains('.') && cleaned.contains(',') {
        cleaned.replace(',', "")
    } else if cleaned.contains(',') {
        if COMMA_DECIMAL_TAIL.is_match(&cleaned) {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

/// Extract the transaction total, if any amount is present.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new().extract(text).map(|m| m.value)
}
