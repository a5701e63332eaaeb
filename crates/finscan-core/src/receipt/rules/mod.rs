//! Rule-based field extractors for receipts.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod line_items;
pub mod merchant;
pub mod patterns;
pub mod tax;

pub use amounts::{extract_amount, normalize_amount, AmountExtractor};
pub use currency::extract_currency;
pub use dates::{extract_date, DateExtractor};
pub use line_items::{extract_line_items, LineItemExtractor};
pub use merchant::extract_merchant;
pub use tax::extract_tax;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all candidate occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value recovered from text, with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
