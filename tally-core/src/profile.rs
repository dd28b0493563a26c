//! Institution descriptors.
//!
//! Everything that used to be per-bank branching logic is data here: header
//! vocabulary, positional fallback rules, section markers, boilerplate
//! patterns, totals-line handling, and debit/credit vocabulary. The pipeline
//! components interpret a descriptor; adding an institution means adding a
//! TOML file, not code.

use crate::amount::SeparatorHint;
use crate::diag::NormalizeError;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Semantic column roles a statement table can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Description,
    Debit,
    Credit,
    Balance,
    Reference,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Date,
        Field::Description,
        Field::Debit,
        Field::Credit,
        Field::Balance,
        Field::Reference,
    ];
}

/// Header vocabulary per semantic field. Vocabulary varies by source
/// ("Fecha"/"Date", "Saldo"/"Balance"), so these are data, not code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderKeywords {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub balance: Vec<String>,
    pub reference: Vec<String>,
}

impl HeaderKeywords {
    pub fn for_field(&self, field: Field) -> &[String] {
        match field {
            Field::Date => &self.date,
            Field::Description => &self.description,
            Field::Debit => &self.debit,
            Field::Credit => &self.credit,
            Field::Balance => &self.balance,
            Field::Reference => &self.reference,
        }
    }
}

/// Declarative positional fallback: "column 0 is the date", "the last column
/// is the balance", "one before the last is the movement amount".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalRule {
    pub field: Field,
    /// Cell index counted from the start of the row.
    #[serde(default)]
    pub index: Option<usize>,
    /// Cell index counted from the end of the row (0 = last cell).
    #[serde(default)]
    pub from_end: Option<usize>,
}

/// What a named sub-section does to the rows that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRole {
    /// Following movements are credits until the next marker.
    Credits,
    /// Following movements are debits until the next marker.
    Debits,
    /// Marker resets any forced role.
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    /// Case-insensitive regex matched against the joined row text.
    pub pattern: String,
    pub role: SectionRole,
}

/// Whether a matching totals line supersedes or augments the detail line it
/// follows. Source formats genuinely disagree, so this is per-institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsMode {
    Replace,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsRule {
    /// Case-insensitive regex matched against the joined row text.
    pub pattern: String,
    pub mode: TotalsMode,
}

fn default_reference_threshold() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_balance_tolerance() -> Decimal {
    // Absorbs rounding in the source's own balance column.
    Decimal::new(1, 2)
}

/// One institution's declarative configuration, as deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub separator_hint: SeparatorHint,
    /// chrono format strings tried in order against date-shaped tokens.
    #[serde(default)]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub headers: HeaderKeywords,
    #[serde(default)]
    pub positional: Vec<PositionalRule>,
    #[serde(default)]
    pub sections: Vec<SectionRule>,
    /// Boilerplate/legal-notice patterns; matching rows never reach the ledger.
    #[serde(default)]
    pub metadata_patterns: Vec<String>,
    #[serde(default)]
    pub totals: Option<TotalsRule>,
    /// Description vocabulary that marks a movement as reducing the balance.
    #[serde(default)]
    pub debit_keywords: Vec<String>,
    /// Description vocabulary that marks a movement as increasing the balance.
    #[serde(default)]
    pub credit_keywords: Vec<String>,
    /// A leftover candidate amount at or below this magnitude is plausibly a
    /// voucher/reference number rather than a second monetary value.
    #[serde(default = "default_reference_threshold")]
    pub reference_threshold: Decimal,
    /// Absolute tolerance for the recorded-vs-computed closing balance.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
}

impl InstitutionProfile {
    pub fn from_toml(text: &str) -> Result<Self, NormalizeError> {
        toml::from_str(text).map_err(|e| NormalizeError::InvalidProfile(e.to_string()))
    }

    /// Compile regex patterns and fold keyword sets once, up front.
    pub fn compile(self) -> Result<CompiledProfile, NormalizeError> {
        let build = |p: &str| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| NormalizeError::InvalidProfile(format!("pattern `{p}`: {e}")))
        };

        let sections = self
            .sections
            .iter()
            .map(|s| Ok((build(&s.pattern)?, s.role)))
            .collect::<Result<Vec<_>, NormalizeError>>()?;
        let metadata = self
            .metadata_patterns
            .iter()
            .map(|p| build(p))
            .collect::<Result<Vec<_>, NormalizeError>>()?;
        let totals = match &self.totals {
            Some(t) => Some((build(&t.pattern)?, t.mode)),
            None => None,
        };

        let folded = |words: &[String]| words.iter().map(|w| fold(w)).collect::<Vec<_>>();
        let header_keywords = Field::ALL
            .iter()
            .map(|f| (*f, folded(self.headers.for_field(*f))))
            .collect();
        let debit_keywords = folded(&self.debit_keywords);
        let credit_keywords = folded(&self.credit_keywords);

        Ok(CompiledProfile {
            header_keywords,
            sections,
            metadata,
            totals,
            debit_keywords,
            credit_keywords,
            profile: self,
        })
    }
}

/// Case/accent folding used for all keyword matching: NFD, combining marks
/// dropped, lowercased. "Débito" and "DEBITO" compare equal.
pub fn fold(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// An [`InstitutionProfile`] with patterns compiled and keywords folded.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub profile: InstitutionProfile,
    header_keywords: Vec<(Field, Vec<String>)>,
    sections: Vec<(Regex, SectionRole)>,
    metadata: Vec<Regex>,
    totals: Option<(Regex, TotalsMode)>,
    debit_keywords: Vec<String>,
    credit_keywords: Vec<String>,
}

impl CompiledProfile {
    /// Which semantic field does this header cell name, if any?
    pub fn header_field(&self, cell: &str) -> Option<Field> {
        let folded = fold(cell.trim());
        if folded.is_empty() {
            return None;
        }
        self.header_keywords
            .iter()
            .find(|(_, words)| words.iter().any(|w| folded.contains(w.as_str())))
            .map(|(f, _)| *f)
    }

    pub fn section_role(&self, text: &str) -> Option<SectionRole> {
        self.sections.iter().find(|(re, _)| re.is_match(text)).map(|(_, role)| *role)
    }

    pub fn is_metadata(&self, text: &str) -> bool {
        self.metadata.iter().any(|re| re.is_match(text))
    }

    pub fn totals_match(&self, text: &str) -> Option<TotalsMode> {
        self.totals.as_ref().filter(|(re, _)| re.is_match(text)).map(|(_, mode)| *mode)
    }

    /// Keyword heuristic over a description: does the vocabulary say this
    /// movement reduces or increases the balance? `None` when neither (or
    /// both) vocabularies match.
    pub fn movement_direction(&self, description: &str) -> Option<MovementDirection> {
        let folded = fold(description);
        let debit = self.debit_keywords.iter().any(|w| folded.contains(w.as_str()));
        let credit = self.credit_keywords.iter().any(|w| folded.contains(w.as_str()));
        match (debit, credit) {
            (true, false) => Some(MovementDirection::Debit),
            (false, true) => Some(MovementDirection::Credit),
            _ => None,
        }
    }

    pub fn separator_hint(&self) -> SeparatorHint {
        self.profile.separator_hint
    }

    pub fn date_formats(&self) -> &[String] {
        &self.profile.date_formats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    Debit,
    Credit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompiledProfile {
        InstitutionProfile::from_toml(
            r#"
id = "testbank"
name = "Test Bank"
separator_hint = "comma_decimal"
date_formats = ["%d/%m/%y"]
metadata_patterns = ["continued on next page"]
debit_keywords = ["pago", "debito"]
credit_keywords = ["deposito", "acreditacion"]

[headers]
date = ["fecha"]
description = ["concepto", "detalle"]
debit = ["debito"]
credit = ["credito"]
balance = ["saldo"]

[[positional]]
field = "date"
index = 0

[[positional]]
field = "balance"
from_end = 0

[[sections]]
pattern = "VENTAS\\s+VISA"
role = "credits"

[totals]
pattern = "\\*TOTAL\\*"
mode = "replace"
"#,
        )
        .unwrap()
        .compile()
        .unwrap()
    }

    #[test]
    fn test_header_field_is_accent_and_case_insensitive() {
        let p = sample();
        assert_eq!(p.header_field("Débito"), Some(Field::Debit));
        assert_eq!(p.header_field("CRÉDITO"), Some(Field::Credit));
        assert_eq!(p.header_field("Saldo"), Some(Field::Balance));
        assert_eq!(p.header_field("Fecha valor"), Some(Field::Date));
        assert_eq!(p.header_field("Importe"), None);
        assert_eq!(p.header_field(""), None);
    }

    #[test]
    fn test_section_and_totals_rules() {
        let p = sample();
        assert_eq!(p.section_role("VENTAS VISA CREDITO"), Some(SectionRole::Credits));
        assert_eq!(p.section_role("ordinary row"), None);
        assert_eq!(p.totals_match("*TOTAL* 62.028,96"), Some(TotalsMode::Replace));
        assert!(p.is_metadata("Continued on next page"));
    }

    #[test]
    fn test_movement_direction_keywords() {
        let p = sample();
        assert_eq!(p.movement_direction("PAGO SERVICIO LUZ"), Some(MovementDirection::Debit));
        assert_eq!(p.movement_direction("Depósito en efectivo"), Some(MovementDirection::Credit));
        // Both vocabularies present: ambiguous, no answer.
        assert_eq!(p.movement_direction("pago deposito"), None);
        assert_eq!(p.movement_direction("transferencia"), None);
    }

    #[test]
    fn test_defaults_applied() {
        let p = InstitutionProfile::from_toml("id = \"x\"\nname = \"X\"").unwrap();
        assert_eq!(p.separator_hint, SeparatorHint::Auto);
        assert_eq!(p.balance_tolerance, Decimal::new(1, 2));
        assert!(p.totals.is_none());
    }

    #[test]
    fn test_bad_pattern_is_invalid_profile() {
        let p = InstitutionProfile {
            metadata_patterns: vec!["(".into()],
            ..InstitutionProfile::from_toml("id = \"x\"\nname = \"X\"").unwrap()
        };
        assert!(p.compile().is_err());
    }
}
