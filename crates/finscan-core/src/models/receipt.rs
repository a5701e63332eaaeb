//! Structured fields recovered from receipt text.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Maximum length of merchant and line item names.
pub const MAX_NAME_CHARS: usize = 255;

/// Candidate transaction attributes parsed from raw text.
///
/// Every field is independently optional except `currency`, which always
/// carries a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFields {
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub merchant: Option<String>,
    /// ISO 4217 code.
    pub currency: String,
    pub tax: Option<Decimal>,
    pub line_items: Vec<LineItemCandidate>,
}

impl ParsedFields {
    /// A transaction is only created when a non-zero amount and a date were found.
    pub fn has_transaction_fields(&self) -> bool {
        self.amount.is_some_and(|amount| !amount.is_zero()) && self.date.is_some()
    }
}

/// A line item recognized on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemCandidate {
    pub name: String,
    /// Quantity with three fractional digits.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `quantity * unit_price`, rounded half away from zero to cents.
    pub total_price: Decimal,
}

impl LineItemCandidate {
    /// Returns `None` when the total does not fit in a `Decimal`.
    pub fn new(name: &str, mut quantity: Decimal, unit_price: Decimal) -> Option<Self> {
        quantity.rescale(3);
        let total_price = quantity
            .checked_mul(unit_price)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Some(Self {
            name: truncate_chars(name.trim(), MAX_NAME_CHARS),
            quantity,
            unit_price,
            total_price,
        })
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
