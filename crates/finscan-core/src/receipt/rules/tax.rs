//! Tax amount extraction.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{NALOG_LABELED, TAX_LABELED, VAT_LABELED};

/// Find a labeled tax amount.
///
/// Labels are tried in order (tax, vat, налог) and the first match wins.
/// `_total` is accepted so callers can pass the parsed total, but it is
/// not used to validate the figure.
pub fn extract_tax(text: &str, _total: Option<Decimal>) -> Option<Decimal> {
    [&*TAX_LABELED, &*VAT_LABELED, &*NALOG_LABELED]
        .into_iter()
        .filter_map(|pattern| pattern.captures(text))
        .find_map(|caps| Decimal::from_str(&caps[1].replace(',', ".")).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Option<Decimal> {
        Some(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_tax_label() {
        assert_eq!(extract_tax("Tax: 0.82", None), dec("0.82"));
        assert_eq!(extract_tax("TAX $0.82", None), dec("0.82"));
    }

    #[test]
    fn test_parenthetical_qualifier() {
        assert_eq!(extract_tax("Sales Tax (8%): 2.40", None), dec("2.40"));
    }

    #[test]
    fn test_vat_with_comma() {
        assert_eq!(extract_tax("VAT 20%\nvat: 1,50", None), dec("1.50"));
    }

    #[test]
    fn test_cyrillic_label() {
        assert_eq!(extract_tax("НАЛОГ: 15,00", None), dec("15.00"));
    }

    #[test]
    fn test_tax_before_vat() {
        assert_eq!(extract_tax("VAT: 9.99\nTax: 1.00", None), dec("1.00"));
    }

    #[test]
    fn test_total_is_not_used() {
        assert_eq!(extract_tax("Tax: 50.00", dec("10.00")), dec("50.00"));
        assert_eq!(extract_tax("Total: 10.00", None), None);
    }
}
