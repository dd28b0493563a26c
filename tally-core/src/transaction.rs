//! Logical and classified transaction types, and the per-statement ledger.

use crate::amount::Amount;
use crate::row::{RowRef, TableRef};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Best-effort role guess attached by the coalescer before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleHint {
    Debit,
    Credit,
    Balance,
    Unknown,
}

/// One amount found in a logical transaction, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedAmount {
    pub amount: Amount,
    /// Cell index within the originating row, when the amount sat in its own
    /// cell; `None` for amounts scraped out of free text.
    pub cell: Option<usize>,
    pub hint: RoleHint,
}

impl TaggedAmount {
    pub fn new(amount: Amount, cell: Option<usize>, hint: RoleHint) -> Self {
        Self { amount, cell, hint }
    }
}

/// The result of merging one or more raw rows believed to represent a single
/// financial movement. Replaced wholesale when re-coalesced, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTransaction {
    pub date: Option<NaiveDate>,
    /// Original date token, kept even when parsing failed.
    pub date_raw: String,
    pub description: String,
    pub amounts: Vec<TaggedAmount>,
    /// Text of an explicitly mapped reference column, when one exists.
    pub reference: Option<String>,
    pub origin: Vec<RowRef>,
}

impl LogicalTransaction {
    pub fn has_amounts(&self) -> bool {
        !self.amounts.is_empty()
    }

    pub fn push_description(&mut self, text: &str) {
        let t = text.trim();
        if t.is_empty() {
            return;
        }
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(t);
    }
}

/// Final classified movement. At most one of `debit`/`credit` is populated;
/// a row may carry only a balance (e.g. an opening-balance marker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub debit: Option<Amount>,
    pub credit: Option<Amount>,
    pub balance: Option<Amount>,
    pub reference: Option<String>,
    /// Set when the classifier could not fully disambiguate the amounts.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub low_confidence: bool,
    pub origin: Vec<RowRef>,
}

impl Transaction {
    /// True when this row records an actual movement (not a balance marker).
    pub fn is_movement(&self) -> bool {
        self.debit.is_some() || self.credit.is_some()
    }

    /// Key used by the ledger builder to spot the same monetary event seen
    /// twice by overlapping extraction passes: date + case/space-normalized
    /// description + every populated amount.
    pub fn dedup_key(&self) -> String {
        let desc = self
            .description
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let part = |a: &Option<Amount>| a.as_ref().map(|v| v.value.to_string()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}",
            self.date.map(|d| d.to_string()).unwrap_or_default(),
            desc,
            part(&self.debit),
            part(&self.credit),
            part(&self.balance),
        )
    }
}

/// Ordered transaction ledger for one statement. Document order is preserved;
/// the ledger is never re-sorted by date or value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub transactions: Vec<Transaction>,
    pub source_tables: Vec<TableRef>,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Last recorded balance cell in document order, if any.
    pub fn last_recorded_balance(&self) -> Option<&Amount> {
        self.transactions.iter().rev().find_map(|t| t.balance.as_ref())
    }
}
