//! Currency detection.

use super::patterns::CURRENCY_CODE;

/// Symbols in priority order. The first one present anywhere in the text wins.
pub const CURRENCY_SYMBOLS: [(char, &str); 4] =
    [('$', "USD"), ('€', "EUR"), ('£', "GBP"), ('₽', "RUB")];

/// Detect the currency of a receipt.
///
/// Symbols are checked before codes, so a receipt showing `€` and `USD`
/// is EUR.
pub fn extract_currency(text: &str, default_currency: &str) -> String {
    if let Some((_, code)) = CURRENCY_SYMBOLS.iter().find(|(symbol, _)| text.contains(*symbol)) {
        return code.to_string();
    }

    CURRENCY_CODE
        .captures(text)
        .map(|caps| caps[1].to_uppercase())
        .unwrap_or_else(|| default_currency.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_beats_code() {
        assert_eq!(extract_currency("Total €12.00 (approx 13 USD)", "USD"), "EUR");
    }

    #[test]
    fn test_symbol_priority_order() {
        assert_eq!(extract_currency("£5.00 or €6.00", "USD"), "EUR");
        assert_eq!(extract_currency("₽100,00 / $1.10", "USD"), "USD");
    }

    #[test]
    fn test_code_case_insensitive() {
        assert_eq!(extract_currency("amount 12.00 gbp", "USD"), "GBP");
    }

    #[test]
    fn test_code_requires_word_boundary() {
        assert_eq!(extract_currency("EUROPA STORE", "USD"), "USD");
    }

    #[test]
    fn test_default() {
        assert_eq!(extract_currency("", "USD"), "USD");
        assert_eq!(extract_currency("no money", "RUB"), "RUB");
    }
}
