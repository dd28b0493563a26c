//! Diagnostics and the one fatal error.
//!
//! Parsing and classification problems are recovered at row or table
//! granularity and recorded here; only a statement with no usable tables at
//! all fails outright. An amount is never fabricated to paper over a token
//! that would not parse.

use crate::row::RowRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A token looked numeric but could not be normalized; the owning row is
    /// kept with the field left unparsed.
    UnparsableAmount,
    /// Neither a header nor a positional rule resolved a required field for a
    /// table; its transactions are still emitted with that field empty.
    NoHeaderAndNoFallback,
    /// A continuation row had no open transaction to attach to; dropped.
    OrphanContinuation,
    /// Recorded closing balance disagrees with the computed one.
    BalanceMismatch,
    /// A transaction closed with no amounts and a non-boilerplate description.
    EmptyTransactionDropped,
    /// No declared or derivable opening balance; zero assumed.
    OpeningBalanceAssumedZero,
    /// Multiple candidate amounts survived keyword and threshold resolution.
    AmbiguousAmounts,
    /// An exact repeat of an earlier transaction was removed.
    DuplicateDropped,
}

/// One recoverable problem, attached at row, table, or statement level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub at: Option<RowRef>,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Self { kind, at: None, detail: detail.into() }
    }

    pub fn at_row(kind: DiagnosticKind, at: RowRef, detail: impl Into<String>) -> Self {
        Self { kind, at: Some(at), detail: detail.into() }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.at {
            Some(at) => write!(f, "{:?} at {}: {}", self.kind, at, self.detail),
            None => write!(f, "{:?}: {}", self.kind, self.detail),
        }
    }
}

/// Statement-level failure. Everything else is a [`Diagnostic`].
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("statement has no usable tables")]
    NoUsableTables,
    #[error("unknown institution profile `{0}`")]
    UnknownProfile(String),
    #[error("invalid institution profile: {0}")]
    InvalidProfile(String),
    #[error("declared opening balance `{token}` is unparsable: {source}")]
    BadDeclaredOpening {
        token: String,
        source: crate::amount::AmountError,
    },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
