//! Line item extraction.
//!
//! Only `<words> <integer>[x|*] <price>` lines such as `Milk 2x 3.50` are
//! recognized. Most real receipt layouts will not match.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use super::patterns::LINE_ITEM;
use super::FieldExtractor;
use crate::models::receipt::LineItemCandidate;

/// Line item extractor.
pub struct LineItemExtractor;

impl LineItemExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LineItemExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for LineItemExtractor {
    type Output = LineItemCandidate;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        LINE_ITEM
            .captures_iter(text)
            .filter_map(|caps| {
                let quantity = Decimal::from_str(&caps[2]).ok();
                let unit_price = Decimal::from_str(&caps[3].replace(',', ".")).ok();
                let item = quantity
                    .zip(unit_price)
                    .and_then(|(quantity, unit_price)| {
                        LineItemCandidate::new(&caps[1], quantity, unit_price)
                    });

                if item.is_none() {
                    trace!("Skipping malformed line item {:?}", &caps[0]);
                }
                item
            })
            .collect()
    }
}

/// Extract all recognizable line items.
pub fn extract_line_items(text: &str) -> Vec<LineItemCandidate> {
    LineItemExtractor::new().extract_all(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_simple_items() {
        let items = extract_line_items("Milk 2x 3.50\nBread 1 2,25\n");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].quantity, dec("2.000"));
        assert_eq!(items[0].unit_price, dec("3.50"));
        assert_eq!(items[0].total_price, dec("7.00"));

        assert_eq!(items[1].name, "Bread");
        assert_eq!(items[1].unit_price, dec("2.25"));
    }

    #[test]
    fn test_star_multiplier() {
        let items = extract_line_items("Eggs 12* 0.30");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total_price, dec("3.60"));
    }

    #[test]
    fn test_oversized_quantity_is_skipped() {
        let items = extract_line_items("Widget 99999999999999999999999999999999 1.00");
        assert!(items.is_empty());
    }

    #[test]
    fn test_overflowing_total_is_skipped() {
        let items = extract_line_items("Widget 9999999999999999999999999 99.99");
        assert!(items.is_empty());
    }

    #[test]
    fn test_no_items() {
        assert!(extract_line_items("TOTAL $11.08").is_empty());
        assert!(extract_line_items("").is_empty());
    }
}
