//! Monetary token normalization.
//!
//! Statement extractors emit amounts in whatever convention the source bank
//! prints: `1,234.56`, `1.234,56`, `45,00-`, `(45.00)`, sometimes with a
//! currency symbol or a stray status code glued on. Parsing is total: a token
//! either yields an [`Amount`] or an explicit [`AmountError`], never a silent
//! wrong value.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// A signed canonical decimal amount plus the original token it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    /// Original text token, kept for audit/debugging.
    pub raw: String,
}

impl Amount {
    pub fn new(value: Decimal, raw: impl Into<String>) -> Self {
        Self { value, raw: raw.into() }
    }

    /// Magnitude, for threshold comparisons.
    pub fn abs(&self) -> Decimal {
        self.value.abs()
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Which character plays the decimal separator when a token alone cannot say.
///
/// Structural inspection always wins when both separators occur; the hint only
/// settles the single-separator three-digit case (`123,456`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorHint {
    #[default]
    Auto,
    /// `,` is the decimal separator, `.` groups thousands.
    CommaDecimal,
    /// `.` is the decimal separator, `,` groups thousands.
    DotDecimal,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("token `{0}` contains no digit groups")]
    NoDigits(String),
    #[error("token `{0}` carries more than one negative-sign marker")]
    DoubleSign(String),
    #[error("token `{0}` has inconsistent digit grouping")]
    BadGrouping(String),
    #[error("token `{0}` does not fit a decimal value")]
    OutOfRange(String),
}

/// Currency markers stripped before structural inspection.
const CURRENCY_CHARS: &[char] = &['$', '€', '£', '¥', '₡', '₲'];

fn strip_currency(s: &str) -> &str {
    let mut t = s.trim();
    // Leading symbol, optionally preceded by a short code: "US$ 1.234", "$1,00".
    static LEAD: OnceLock<Regex> = OnceLock::new();
    let lead = LEAD.get_or_init(|| Regex::new(r"^[A-Za-z]{0,3}[$€£¥₡₲]\s*").unwrap());
    if let Some(m) = lead.find(t) {
        t = &t[m.end()..];
    }
    t = t.trim_start_matches(|c: char| CURRENCY_CHARS.contains(&c) || c.is_whitespace());
    t = t.trim_end_matches(|c: char| CURRENCY_CHARS.contains(&c) || c.is_whitespace());
    t
}

/// Drops a short trailing alphabetic code the extractor glued onto the number
/// ("62.028,96AR"). Anything longer than three letters is not treated as
/// noise; the token will fail grouping validation instead.
fn strip_noise_suffix(s: &str) -> &str {
    let trailing_alpha = s.chars().rev().take_while(|c| c.is_ascii_alphabetic()).count();
    if (1..=3).contains(&trailing_alpha) {
        s[..s.len() - trailing_alpha].trim_end()
    } else {
        s
    }
}

/// Parse one monetary text token into a signed canonical amount.
///
/// Separator resolution:
/// - both `.` and `,` present: the rightmost separator followed by exactly two
///   digits is the decimal separator, the other groups thousands, regardless
///   of which literal character each is;
/// - one separator, one occurrence: a 1-2 digit trailing group is decimal, a
///   3-digit trailing group is thousands unless `hint` claims that character
///   as decimal;
/// - one separator, repeated: thousands grouping, validated as such.
///
/// A leading `-`, a trailing `-`, or surrounding parentheses denote negative;
/// more than one of those at once is malformed.
pub fn parse_amount(token: &str, hint: SeparatorHint) -> Result<Amount, AmountError> {
    let raw = token.trim().to_string();
    let mut s = raw.as_str();

    if !s.chars().any(|c| c.is_ascii_digit()) {
        return Err(AmountError::NoDigits(raw));
    }

    let mut negatives = 0usize;
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s = s[1..s.len() - 1].trim();
        negatives += 1;
    }

    s = strip_currency(s);

    if let Some(rest) = s.strip_prefix('-') {
        s = rest.trim_start();
        negatives += 1;
    }
    if let Some(rest) = s.strip_suffix('-') {
        s = rest.trim_end();
        negatives += 1;
    }
    if negatives > 1 || s.contains('-') {
        return Err(AmountError::DoubleSign(raw));
    }

    s = strip_currency(s);
    let stripped = strip_noise_suffix(s);

    // OCR occasionally inserts spaces inside a number; collapse them before
    // structural validation.
    let compact: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();

    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| Regex::new(r"^[0-9]+(?:[.,][0-9]+)*$").unwrap());
    if compact.is_empty() {
        return Err(AmountError::NoDigits(raw));
    }
    if !shape.is_match(&compact) {
        return Err(AmountError::BadGrouping(raw));
    }

    let canonical = canonicalize_separators(&compact, hint).ok_or_else(|| AmountError::BadGrouping(raw.clone()))?;

    let mut value = Decimal::from_str(&canonical).map_err(|_| AmountError::OutOfRange(raw.clone()))?;
    if negatives == 1 {
        value = -value;
    }
    Ok(Amount { value, raw })
}

/// Rewrite `compact` (digits plus `.`/`,` only) into a plain `1234.56` form,
/// or `None` when no consistent grouping exists.
fn canonicalize_separators(compact: &str, hint: SeparatorHint) -> Option<String> {
    let has_dot = compact.contains('.');
    let has_comma = compact.contains(',');

    let (decimal_sep, thousands_sep) = match (has_dot, has_comma) {
        (false, false) => return Some(compact.to_string()),
        (true, true) => {
            let last_sep_pos = compact.rfind(['.', ','])?;
            let last_sep = compact.as_bytes()[last_sep_pos] as char;
            let trailing = compact.len() - last_sep_pos - 1;
            if trailing != 2 {
                return None;
            }
            let other = if last_sep == '.' { ',' } else { '.' };
            (Some(last_sep), Some(other))
        }
        (true, false) | (false, true) => {
            let sep = if has_dot { '.' } else { ',' };
            let occurrences = compact.matches(sep).count();
            let trailing = compact.len() - compact.rfind(sep)? - 1;
            if occurrences > 1 {
                // Repeated separator can only group thousands.
                (None, Some(sep))
            } else {
                let hinted_decimal = match hint {
                    SeparatorHint::CommaDecimal => Some(','),
                    SeparatorHint::DotDecimal => Some('.'),
                    SeparatorHint::Auto => None,
                };
                match trailing {
                    1 | 2 => (Some(sep), None),
                    3 if hinted_decimal == Some(sep) => (Some(sep), None),
                    3 => (None, Some(sep)),
                    _ => (Some(sep), None),
                }
            }
        }
    };

    // Validate thousands grouping: 1-3 digits, then exact groups of 3 up to
    // the decimal point (or end of token).
    let (int_part, frac_part) = match decimal_sep {
        Some(d) => {
            let pos = compact.rfind(d)?;
            (&compact[..pos], Some(&compact[pos + 1..]))
        }
        None => (compact, None),
    };

    let mut digits = String::with_capacity(compact.len());
    if let Some(t) = thousands_sep {
        let groups: Vec<&str> = int_part.split(t).collect();
        if groups.len() < 2 && decimal_sep.is_none() {
            return None;
        }
        for (i, g) in groups.iter().enumerate() {
            let ok = if i == 0 { (1..=3).contains(&g.len()) } else { g.len() == 3 };
            if !ok || g.contains(['.', ',']) {
                return None;
            }
            digits.push_str(g);
        }
    } else {
        if int_part.contains(['.', ',']) {
            return None;
        }
        digits.push_str(int_part);
    }

    if let Some(frac) = frac_part {
        if frac.is_empty() || frac.contains(['.', ',']) {
            return None;
        }
        digits.push('.');
        digits.push_str(frac);
    }
    Some(digits)
}

/// Formatting convention used when rendering canonical values back into
/// locale-specific text (round-trip tests, debug dumps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorConvention {
    /// `1,234.56`
    DotDecimal,
    /// `1.234,56`
    CommaDecimal,
}

/// Render `value` with thousands grouping in the given convention, always
/// with two decimal places.
pub fn format_amount(value: Decimal, convention: SeparatorConvention) -> String {
    let (decimal, thousands) = match convention {
        SeparatorConvention::DotDecimal => ('.', ','),
        SeparatorConvention::CommaDecimal => (',', '.'),
    };

    let rounded = value.round_dp(2);
    let negative = rounded.is_sign_negative();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i.to_string(), format!("{f:0<2}")),
        None => (plain, "00".to_string()),
    };

    let mut grouped = String::new();
    let bytes = int_part.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(*b as char);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    out.push(decimal);
    out.push_str(&frac_part);
    out
}

/// Loose shape test used by the row classifier: does this token read like a
/// monetary literal? Plain digit runs do not qualify (they are usually
/// reference or voucher numbers); a separator, currency marker, or sign must
/// be present.
pub fn looks_like_amount(token: &str) -> bool {
    let t = token.trim();
    if t.is_empty() {
        return false;
    }
    let marked = t.contains(['.', ','])
        || t.contains(CURRENCY_CHARS)
        || t.starts_with('-')
        || t.ends_with('-')
        || (t.starts_with('(') && t.ends_with(')'));
    marked && parse_amount(t, SeparatorHint::Auto).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(token: &str) -> Decimal {
        parse_amount(token, SeparatorHint::Auto).unwrap().value
    }

    #[test]
    fn test_both_separators_rightmost_two_digit_group_is_decimal() {
        assert_eq!(parse("1.234,56"), dec!(1234.56));
        assert_eq!(parse("1,234.56"), dec!(1234.56));
        assert_eq!(parse("12.345.678,90"), dec!(12345678.90));
    }

    #[test]
    fn test_single_separator_two_digits_is_decimal() {
        assert_eq!(parse("-45,00"), dec!(-45.00));
        assert_eq!(parse("45.00"), dec!(45.00));
        assert_eq!(parse("0,5"), dec!(0.5));
    }

    #[test]
    fn test_single_separator_three_digits_is_thousands() {
        assert_eq!(parse("1,234"), dec!(1234));
        assert_eq!(parse("62.028"), dec!(62028));
    }

    #[test]
    fn test_hint_overrides_three_digit_ambiguity() {
        let v = parse_amount("123,456", SeparatorHint::CommaDecimal).unwrap();
        assert_eq!(v.value, dec!(123.456));
        let v = parse_amount("123,456", SeparatorHint::Auto).unwrap();
        assert_eq!(v.value, dec!(123456));
    }

    #[test]
    fn test_repeated_separator_is_thousands() {
        assert_eq!(parse("1.234.567"), dec!(1234567));
        assert!(parse_amount("1.23.4", SeparatorHint::Auto).is_err());
    }

    #[test]
    fn test_negative_markers() {
        assert_eq!(parse("-45,00"), dec!(-45.00));
        assert_eq!(parse("45,00-"), dec!(-45.00));
        assert_eq!(parse("(45.00)"), dec!(-45.00));
    }

    #[test]
    fn test_double_sign_is_unparsable() {
        assert!(matches!(
            parse_amount("(-45.00)", SeparatorHint::Auto),
            Err(AmountError::DoubleSign(_))
        ));
        assert!(matches!(
            parse_amount("-45.00-", SeparatorHint::Auto),
            Err(AmountError::DoubleSign(_))
        ));
    }

    #[test]
    fn test_currency_and_noise_suffix_stripping() {
        assert_eq!(parse("$ 1,234.56"), dec!(1234.56));
        assert_eq!(parse("US$ 900,00"), dec!(900.00));
        assert_eq!(parse("62.028,96AR"), dec!(62028.96));
        assert_eq!(parse("100,00 DB"), dec!(100.00));
    }

    #[test]
    fn test_no_digits_is_unparsable() {
        assert!(matches!(
            parse_amount("TOTAL", SeparatorHint::Auto),
            Err(AmountError::NoDigits(_))
        ));
        assert!(parse_amount("", SeparatorHint::Auto).is_err());
        assert!(parse_amount("--", SeparatorHint::Auto).is_err());
    }

    #[test]
    fn test_bad_grouping_is_unparsable_not_zero() {
        assert!(parse_amount("12,34,56", SeparatorHint::Auto).is_err());
        assert!(parse_amount("1.2345,6.7", SeparatorHint::Auto).is_err());
        assert!(parse_amount("01/09/25", SeparatorHint::Auto).is_err());
    }

    #[test]
    fn test_raw_token_preserved() {
        let a = parse_amount(" (1.234,56) ", SeparatorHint::Auto).unwrap();
        assert_eq!(a.raw, "(1.234,56)");
        assert_eq!(a.value, dec!(-1234.56));
    }

    #[test]
    fn test_format_round_trip_both_conventions() {
        for v in [dec!(0.00), dec!(45.00), dec!(1234.56), dec!(-62028.96), dec!(999.99)] {
            let dot = format_amount(v, SeparatorConvention::DotDecimal);
            let comma = format_amount(v, SeparatorConvention::CommaDecimal);
            assert_eq!(parse_amount(&dot, SeparatorHint::Auto).unwrap().value, v);
            assert_eq!(parse_amount(&comma, SeparatorHint::Auto).unwrap().value, v);
        }
    }

    #[test]
    fn test_format_grouping() {
        assert_eq!(format_amount(dec!(1234567.8), SeparatorConvention::CommaDecimal), "1.234.567,80");
        assert_eq!(format_amount(dec!(-45), SeparatorConvention::DotDecimal), "-45.00");
    }

    #[test]
    fn test_looks_like_amount_rejects_plain_references() {
        assert!(looks_like_amount("1.234,56"));
        assert!(looks_like_amount("$5.82"));
        assert!(looks_like_amount("-14.05"));
        assert!(!looks_like_amount("8148"));
        assert!(!looks_like_amount("Pago"));
        assert!(!looks_like_amount("01/09/25"));
    }
}
