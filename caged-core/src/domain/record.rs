//! Raw and canonical record shapes.
//!
//! Loading produces a [`RawTable`]: the header row exactly as the release
//! wrote it, plus string-only rows. Normalization turns it into
//! [`CanonicalRecord`]s; nothing downstream ever sees a raw column name.

use serde::{Deserialize, Serialize};

use super::month::ReferenceMonth;

/// One row of an extracted flat file. Fields are positional; the owning
/// [`RawTable`] holds the column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<String>,
}

impl RawRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A loaded flat file: release-specific headers and untyped rows.
///
/// Duplicate header names are preserved here; the normalizer decides which
/// one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The release-independent shape every consumer relies on.
///
/// `balance` and `wage` are always numeric (0 on coercion failure). Code
/// fields are `None` when the release had no resolvable column for them or
/// the cell was blank; each label is filled exactly when its code is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub reference_month: ReferenceMonth,
    /// +1 hire, -1 termination, anything else is noise.
    pub balance: i64,
    /// Non-negative, dot-decimal.
    pub wage: f64,
    pub municipality_code: Option<String>,
    pub municipality: Option<String>,
    pub industry_section_code: Option<String>,
    pub sector: Option<String>,
    pub gender_code: Option<String>,
    pub gender: Option<String>,
}

impl CanonicalRecord {
    pub fn is_admission(&self) -> bool {
        self.balance == 1
    }

    pub fn is_termination(&self) -> bool {
        self.balance == -1
    }
}
