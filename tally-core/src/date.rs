//! Date-shaped token detection and parsing.
//!
//! Statement rows carry dates in per-institution formats (`01/09/25`,
//! `2025-09-01`, `01-Sep`). Formats are profile data; this module only knows
//! how to try them in order.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Default format list tried when a profile declares none.
pub const DEFAULT_DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d"];

/// Shape test: digits separated by `/`, `-` or `.` in a day/month/year-ish
/// arrangement. Intentionally looser than parsing; the classifier only needs
/// "could be a date", the coalescer decides what to do when parsing fails.
pub fn looks_like_date(token: &str) -> bool {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let re = SHAPE.get_or_init(|| {
        // Dot-separated needs all three components so decimal amounts
        // ("45.00") never read as dates.
        Regex::new(
            r"^(\d{1,4}[/-]\d{1,2}([/-]\d{1,4})?|\d{1,2}\.\d{1,2}\.\d{2,4}|\d{1,2}[/\-.][A-Za-z]{3}([/\-.]\d{2,4})?)$",
        )
        .unwrap()
    });
    re.is_match(token.trim())
}

/// Try each configured format in order; `None` when none matches.
pub fn parse_date(token: &str, formats: &[String]) -> Option<NaiveDate> {
    let t = token.trim();
    if formats.is_empty() {
        for fmt in DEFAULT_DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
                return Some(d);
            }
        }
        return None;
    }
    for fmt in formats {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    None
}
