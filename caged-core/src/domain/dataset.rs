//! HistoricalDataset: canonical records merged across a window of months.

use polars::prelude::{DataFrame, PolarsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::month::ReferenceMonth;
use super::record::CanonicalRecord;

/// Concatenation of canonical records from one or more monthly releases.
///
/// Row order carries no meaning; grouping is by `reference_month` only.
/// Rebuilt wholesale per request, never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataset {
    records: Vec<CanonicalRecord>,
}

impl HistoricalDataset {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one month's records.
    pub fn extend(&mut self, records: Vec<CanonicalRecord>) {
        self.records.extend(records);
    }

    /// Distinct reference months present, ascending.
    pub fn months(&self) -> BTreeSet<ReferenceMonth> {
        self.records.iter().map(|r| r.reference_month).collect()
    }

    /// Distinct municipality labels, sorted.
    pub fn municipalities(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.municipality.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows matching an optional city label and an optional sector label.
    pub fn slice(&self, city: Option<&str>, sector: Option<&str>) -> HistoricalDataset {
        let records = self
            .records
            .iter()
            .filter(|r| city.map_or(true, |c| r.municipality.as_deref() == Some(c)))
            .filter(|r| sector.map_or(true, |s| r.sector.as_deref() == Some(s)))
            .cloned()
            .collect();
        Self { records }
    }

    /// Columnar view with the canonical schema.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        crate::data::CanonicalSchema::to_dataframe(&self.records)
    }

    /// BLAKE3 content hash of the records, for report provenance.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.records).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}
