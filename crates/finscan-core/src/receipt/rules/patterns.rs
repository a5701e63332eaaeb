//! Common regex patterns for receipt field extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Date candidates, tried family by family
    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"(\d{4}[/-]\d{1,2}[/-]\d{1,2})"
    ).unwrap();

    pub static ref DATE_WORDED: Regex = Regex::new(
        r"(?i)(\d{1,2}\s+[A-Za-z]{3,9}\s+\d{2,4})"
    ).unwrap();

    // Concrete formats a candidate must match in full
    pub static ref FORMAT_SLASH: Regex = Regex::new(
        r"^(\d{1,2})/(\d{1,2})/(\d{4})$"
    ).unwrap();

    pub static ref FORMAT_ISO_DASH: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})$"
    ).unwrap();

    pub static ref FORMAT_DAY_DASH: Regex = Regex::new(
        r"^(\d{1,2})-(\d{1,2})-(\d{4})$"
    ).unwrap();

    pub static ref FORMAT_WORDED: Regex = Regex::new(
        r"^(\d{1,2})\s+([A-Za-z]+)\s+(\d{4})$"
    ).unwrap();

    // Amounts (1,234.56 / 1 234,56 / 123.45); groups never span lines
    pub static ref AMOUNT_WITH_SYMBOL: Regex = Regex::new(
        r"[$€£₽]\s*(\d{1,3}(?:[, ]\d{3})*(?:[.,]\d{2}))"
    ).unwrap();

    pub static ref AMOUNT_BARE: Regex = Regex::new(
        r"\b(\d{1,3}(?:[, ]\d{3})*[.,]\d{2})\b"
    ).unwrap();

    pub static ref COMMA_DECIMAL_TAIL: Regex = Regex::new(
        r",\d{2}$"
    ).unwrap();

    // Merchant
    pub static ref DIGITS_ONLY: Regex = Regex::new(
        r"^\d+$"
    ).unwrap();

    // Currency codes
    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"(?i)\b(USD|EUR|GBP|RUB)\b"
    ).unwrap();

    // Tax labels, optionally qualified: "Tax (8%): 2.40", "VAT: 1,50"
    pub static ref TAX_LABELED: Regex = Regex::new(
        r"(?i)tax\s*(?:\([^)]*\))?\s*[:\s]+[$€£]?\s*(\d+[.,]\d{2})"
    ).unwrap();

    pub static ref VAT_LABELED: Regex = Regex::new(
        r"(?i)vat\s*(?:\([^)]*\))?\s*[:\s]+[$€£]?\s*(\d+[.,]\d{2})"
    ).unwrap();

    pub static ref NALOG_LABELED: Regex = Regex::new(
        r"(?i)налог\s*(?:\([^)]*\))?\s*[:\s]+[$€£]?\s*(\d+[.,]\d{2})"
    ).unwrap();

    // Line items: "Milk 2x 3.50"
    pub static ref LINE_ITEM: Regex = Regex::new(
        r"([A-Za-z\s]+)\s+(\d+)(?:x|\*)?\s+(\d+[.,]\d{2})"
    ).unwrap();
}
