//! Schema normalizer: maps each release's column names onto the canonical record.
//!
//! Header names go through a fixed pipeline before matching:
//! 1. trim + lowercase
//! 2. drop exact duplicates (first occurrence wins)
//! 3. strip Portuguese diacritics via [`DIACRITICS`]
//!
//! Each canonical field is then resolved with a two-tier rule: an exact name
//! match beats a substring match, and within a tier the first column in
//! header order wins. This tie-break reproduces how the historical releases
//! have always been read. It also means a decoy column that appears before
//! the real one (e.g. `saldo_anterior` ahead of `saldo`) silently wins, so a
//! new release with extra balance-like columns should be checked by hand.
//!
//! Because step 2 runs before step 3, `seção` and `secao` can both survive
//! as `secao`; resolution works on source positions, so only the first of
//! such duplicates is ever read.

use std::collections::HashSet;
use tracing::debug;

use super::error::SchemaError;
use super::lookup::{gender_label, municipality_label, sector_label};
use crate::domain::{CanonicalRecord, RawTable, ReferenceMonth};

/// The only substitutions applied to header names. No general Unicode
/// normalization is performed.
pub const DIACRITICS: &[(char, char)] = &[
    ('ç', 'c'),
    ('ã', 'a'),
    ('õ', 'o'),
    ('á', 'a'),
    ('é', 'e'),
    ('í', 'i'),
    ('ó', 'o'),
    ('ú', 'u'),
    ('ê', 'e'),
];

/// Replace the characters listed in [`DIACRITICS`]. Idempotent.
pub fn strip_diacritics(name: &str) -> String {
    name.chars()
        .map(|c| {
            DIACRITICS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// A header after the name pipeline, with its position in the raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedColumn {
    pub name: String,
    pub index: usize,
}

/// Run the name pipeline over a raw header row.
pub fn normalize_headers(headers: &[String]) -> Vec<NormalizedColumn> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let lowered = raw.trim().to_lowercase();
            if !seen.insert(lowered.clone()) {
                return None;
            }
            Some(NormalizedColumn {
                name: strip_diacritics(&lowered),
                index,
            })
        })
        .collect()
}

/// Exact-then-substring matching rule for one canonical field.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub exact: Option<&'static str>,
    pub fragment: &'static str,
}

pub const BALANCE_RULE: ColumnRule = ColumnRule {
    exact: Some("saldomovimentacao"),
    fragment: "saldo",
};

pub const WAGE_RULE: ColumnRule = ColumnRule {
    exact: Some("salariomovimentacao"),
    fragment: "salario",
};

pub const MUNICIPALITY_RULE: ColumnRule = ColumnRule {
    exact: None,
    fragment: "municipio",
};

pub const SECTION_RULE: ColumnRule = ColumnRule {
    exact: None,
    fragment: "secao",
};

pub const GENDER_RULE: ColumnRule = ColumnRule {
    exact: Some("sexo"),
    fragment: "sexo",
};

impl ColumnRule {
    /// Exact match if any, else the first column containing the fragment.
    pub fn resolve<'c>(&self, columns: &'c [NormalizedColumn]) -> Option<&'c NormalizedColumn> {
        self.exact
            .and_then(|exact| columns.iter().find(|c| c.name == exact))
            .or_else(|| columns.iter().find(|c| c.name.contains(self.fragment)))
    }
}

/// Which normalized column feeds each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnResolution {
    pub balance: Option<NormalizedColumn>,
    pub wage: Option<NormalizedColumn>,
    pub municipality: Option<NormalizedColumn>,
    pub section: Option<NormalizedColumn>,
    pub gender: Option<NormalizedColumn>,
}

pub fn resolve_columns(columns: &[NormalizedColumn]) -> ColumnResolution {
    ColumnResolution {
        balance: BALANCE_RULE.resolve(columns).cloned(),
        wage: WAGE_RULE.resolve(columns).cloned(),
        municipality: MUNICIPALITY_RULE.resolve(columns).cloned(),
        section: SECTION_RULE.resolve(columns).cloned(),
        gender: GENDER_RULE.resolve(columns).cloned(),
    }
}

/// Plain numeric parse; anything unparseable is 0. Decimals truncate toward zero.
pub fn coerce_balance(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return v;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Brazilian-locale decimal (`1.234,56`) to `f64`. Unparseable, negative or
/// non-finite values are 0.
pub fn coerce_wage(raw: &str) -> f64 {
    let plain = raw.trim().replace('.', "").replace(',', ".");
    match plain.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Convert a loaded table into canonical records stamped with `month`.
///
/// Fails only when no balance column can be resolved; the month then
/// contributes nothing rather than rows with a made-up balance.
pub fn normalize(
    table: &RawTable,
    month: ReferenceMonth,
) -> Result<Vec<CanonicalRecord>, SchemaError> {
    let columns = normalize_headers(&table.headers);
    let resolution = resolve_columns(&columns);

    let balance = resolution
        .balance
        .as_ref()
        .ok_or_else(|| SchemaError::MissingBalance {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
        })?
        .index;
    let wage = resolution.wage.as_ref().map(|c| c.index);
    let municipality = resolution.municipality.as_ref().map(|c| c.index);
    let section = resolution.section.as_ref().map(|c| c.index);
    let gender = resolution.gender.as_ref().map(|c| c.index);

    debug!(
        %month,
        balance = name_of(&resolution.balance),
        wage = name_of(&resolution.wage),
        municipality = name_of(&resolution.municipality),
        section = name_of(&resolution.section),
        gender = name_of(&resolution.gender),
        "columns resolved"
    );

    let records = table
        .rows
        .iter()
        .map(|row| {
            // Blank cells read as absent codes, not as an empty label.
            let text = |index: Option<usize>| {
                index
                    .map(|i| row.get(i).unwrap_or_default().trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            let municipality_code = text(municipality);
            let industry_section_code = text(section);
            let gender_code = text(gender);

            CanonicalRecord {
                reference_month: month,
                balance: coerce_balance(row.get(balance).unwrap_or_default()),
                wage: wage
                    .and_then(|i| row.get(i))
                    .map(coerce_wage)
                    .unwrap_or(0.0),
                municipality: municipality_code.as_deref().map(municipality_label),
                municipality_code,
                sector: industry_section_code
                    .as_deref()
                    .map(|c| sector_label(c).to_string()),
                industry_section_code,
                gender: gender_code.as_deref().map(|c| gender_label(c).to_string()),
                gender_code,
            }
        })
        .collect();

    Ok(records)
}

fn name_of(column: &Option<NormalizedColumn>) -> &str {
    column.as_ref().map_or("-", |c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table(names: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers(names),
            rows.iter()
                .map(|r| RawRecord::new(r.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }

    fn month() -> ReferenceMonth {
        ReferenceMonth::new(2024, 3).unwrap()
    }

    #[test]
    fn header_pipeline_trims_lowercases_and_strips() {
        let cols = normalize_headers(&headers(&[" Município ", "SEÇÃO", "salárioMovimentação"]));
        let names: Vec<_> = cols.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["municipio", "secao", "salariomovimentacao"]);
    }

    #[test]
    fn duplicates_are_dropped_before_stripping() {
        let cols = normalize_headers(&headers(&["saldo", "Saldo ", "seção", "secao"]));
        let names: Vec<_> = cols.iter().map(|c| (c.name.as_str(), c.index)).collect();
        assert_eq!(names, vec![("saldo", 0), ("secao", 2), ("secao", 3)]);
        // Resolution reads the first surviving `secao`.
        assert_eq!(SECTION_RULE.resolve(&cols).unwrap().index, 2);
    }

    #[test]
    fn exact_match_beats_earlier_substring() {
        let cols = normalize_headers(&headers(&["saldo_x", "saldomovimentacao", "saldo_y"]));
        assert_eq!(BALANCE_RULE.resolve(&cols).unwrap().name, "saldomovimentacao");
    }

    #[test]
    fn first_substring_wins_without_exact() {
        let cols = normalize_headers(&headers(&["saldo_x", "saldo_y"]));
        assert_eq!(BALANCE_RULE.resolve(&cols).unwrap().name, "saldo_x");
    }

    #[test]
    fn wage_coercion_handles_brazilian_format() {
        assert_eq!(coerce_wage("1.234,56"), 1234.56);
        assert_eq!(coerce_wage("1500"), 1500.0);
        assert_eq!(coerce_wage("abc"), 0.0);
        assert_eq!(coerce_wage(""), 0.0);
        assert_eq!(coerce_wage("-10,00"), 0.0);
    }

    #[test]
    fn balance_coercion_defaults_to_zero() {
        assert_eq!(coerce_balance("1"), 1);
        assert_eq!(coerce_balance("-1"), -1);
        assert_eq!(coerce_balance(" 1 "), 1);
        assert_eq!(coerce_balance("1.0"), 1);
        assert_eq!(coerce_balance(""), 0);
        assert_eq!(coerce_balance("x"), 0);
    }

    #[test]
    fn normalize_maps_labels_and_stamps_month() {
        let t = table(
            &["município", "seção", "saldomovimentação", "salário", "sexo"],
            &[
                &["430460", "G", "1", "2.100,50", "3"],
                &["999999", "Z", "-1", "", "9"],
            ],
        );
        let records = normalize(&t, month()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.reference_month, month());
        assert_eq!(first.balance, 1);
        assert_eq!(first.wage, 2100.5);
        assert_eq!(first.municipality.as_deref(), Some("Canoas (RS)"));
        assert_eq!(first.sector.as_deref(), Some("Comércio"));
        assert_eq!(first.gender.as_deref(), Some("Feminino"));

        let second = &records[1];
        assert_eq!(second.balance, -1);
        assert_eq!(second.wage, 0.0);
        assert_eq!(second.municipality.as_deref(), Some("999999"));
        assert_eq!(second.sector.as_deref(), Some("Other"));
        assert_eq!(second.gender.as_deref(), Some("Other"));
    }

    #[test]
    fn missing_optional_columns_stay_absent() {
        let t = table(&["saldo"], &[&["1"]]);
        let records = normalize(&t, month()).unwrap();
        assert_eq!(records[0].wage, 0.0);
        assert_eq!(records[0].municipality_code, None);
        assert_eq!(records[0].sector, None);
        assert_eq!(records[0].gender, None);
    }

    #[test]
    fn missing_balance_is_schema_error() {
        let t = table(&["municipio", "secao"], &[&["430460", "G"]]);
        let err = normalize(&t, month()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingBalance { columns } if columns.len() == 2));
    }

    #[test]
    fn duplicated_wage_column_reads_first() {
        let t = table(
            &["saldomovimentacao", "salário", "salario"],
            &[&["1", "1.000,00", "9.999,99"]],
        );
        let records = normalize(&t, month()).unwrap();
        assert_eq!(records[0].wage, 1000.0);
    }

    #[test]
    fn blank_codes_carry_no_label() {
        let t = table(
            &["saldomovimentacao", "municipio", "secao", "sexo"],
            &[&["1", "  ", "", " "]],
        );
        let records = normalize(&t, month()).unwrap();
        assert_eq!(records[0].municipality_code, None);
        assert_eq!(records[0].municipality, None);
        assert_eq!(records[0].industry_section_code, None);
        assert_eq!(records[0].sector, None);
        assert_eq!(records[0].gender_code, None);
        assert_eq!(records[0].gender, None);
    }
}
