//! Date extraction for receipts.

use chrono::NaiveDate;
use regex::Regex;
use tracing::trace;

use super::patterns::{
    DATE_ISO, DATE_NUMERIC, DATE_WORDED, FORMAT_DAY_DASH, FORMAT_ISO_DASH, FORMAT_SLASH,
    FORMAT_WORDED,
};
use super::{ExtractionMatch, FieldExtractor};

/// Concrete formats a date candidate is tried against, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `25/12/2025`
    DayMonthSlash,
    /// `12/25/2025`
    MonthDaySlash,
    /// `2025-12-25`
    IsoDash,
    /// `25-12-2025`
    DayMonthDash,
    /// `25 December 2025`
    DayFullMonth,
    /// `25 Dec 2025`
    DayShortMonth,
}

impl DateFormat {
    pub const ORDER: [DateFormat; 6] = [
        DateFormat::DayMonthSlash,
        DateFormat::MonthDaySlash,
        DateFormat::IsoDash,
        DateFormat::DayMonthDash,
        DateFormat::DayFullMonth,
        DateFormat::DayShortMonth,
    ];

    /// Parse `candidate` in full against this format.
    pub fn parse(&self, candidate: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::DayMonthSlash => {
                let (d, m, y) = numeric_parts(&FORMAT_SLASH, candidate)?;
                NaiveDate::from_ymd_opt(y as i32, m, d)
            }
            DateFormat::MonthDaySlash => {
                let (m, d, y) = numeric_parts(&FORMAT_SLASH, candidate)?;
                NaiveDate::from_ymd_opt(y as i32, m, d)
            }
            DateFormat::IsoDash => {
                let (y, m, d) = numeric_parts(&FORMAT_ISO_DASH, candidate)?;
                NaiveDate::from_ymd_opt(y as i32, m, d)
            }
            DateFormat::DayMonthDash => {
                let (d, m, y) = numeric_parts(&FORMAT_DAY_DASH, candidate)?;
                NaiveDate::from_ymd_opt(y as i32, m, d)
            }
            DateFormat::DayFullMonth => worded(candidate, full_month_number),
            DateFormat::DayShortMonth => worded(candidate, short_month_number),
        }
    }
}

fn numeric_parts(format: &Regex, candidate: &str) -> Option<(u32, u32, u32)> {
    let caps = format.captures(candidate)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}

fn worded(candidate: &str, month_number: fn(&str) -> Option<u32>) -> Option<NaiveDate> {
    let caps = FORMAT_WORDED.captures(candidate)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2].to_ascii_lowercase())?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn full_month_number(month: &str) -> Option<u32> {
    let n = match month {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(n)
}

fn short_month_number(month: &str) -> Option<u32> {
    let n = match month {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Try each format in order and return the first that parses.
pub fn parse_date_candidate(candidate: &str) -> Option<NaiveDate> {
    DateFormat::ORDER.iter().find_map(|format| format.parse(candidate))
}

/// Date field extractor.
///
/// Pattern families are scanned in order (numeric, ISO, worded). Only the
/// first match of a family is considered; when none of the formats accept
/// it, the next family gets a chance. This is what lets `2025-12-25` parse
/// even though the numeric family first sees `25-12-25` inside it.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    fn families() -> [&'static Regex; 3] {
        [&*DATE_NUMERIC, &*DATE_ISO, &*DATE_WORDED]
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        for family in Self::families() {
            let Some(m) = family.find(text) else {
                continue;
            };

            match parse_date_candidate(m.as_str()) {
                Some(date) => {
                    return Some(
                        ExtractionMatch::new(date, m.as_str()).with_position(m.start(), m.end()),
                    );
                }
                None => trace!("Date candidate {:?} matched no format", m.as_str()),
            }
        }

        None
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for family in Self::families() {
            for m in family.find_iter(text) {
                if let Some(date) = parse_date_candidate(m.as_str()) {
                    // Skip if already found
                    if results.iter().any(|r| r.value == date) {
                        continue;
                    }
                    results.push(
                        ExtractionMatch::new(date, m.as_str()).with_position(m.start(), m.end()),
                    );
                }
            }
        }

        results
    }
}

/// Extract the transaction date, if the text contains one.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().extract(text).map(|m| m.value)
}
