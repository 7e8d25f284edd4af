//! Flat-file loader: semicolon-delimited UTF-8 text into a [`RawTable`].
//!
//! Every field stays a string. Types are only assigned after the normalizer
//! has decided which column is which, because column names drift between
//! releases and early inference would guess types for unknown columns.
//!
//! Rows past `row_cap` are never read: the dataset is a sample, not a census.

use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::error::ParseError;
use crate::domain::{RawRecord, RawTable};

/// Row cap used when none is configured.
pub const DEFAULT_ROW_CAP: usize = 100_000;

const DELIMITER: u8 = b';';

/// Load at most `row_cap` data rows from the flat file at `path`.
pub fn load(path: &Path, row_cap: usize) -> Result<RawTable, ParseError> {
    let file = std::fs::File::open(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = load_from_reader(file, row_cap, path)?;
    debug!(path = %path.display(), rows = table.len(), columns = table.headers.len(), "flat file loaded");
    Ok(table)
}

/// Same as [`load`], reading from any source; `origin` only labels errors.
pub fn load_from_reader<R: Read>(
    reader: R,
    row_cap: usize,
    origin: &Path,
) -> Result<RawTable, ParseError> {
    let malformed = |source: csv::Error| ParseError::Malformed {
        path: origin.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::MissingHeader {
            path: origin.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records().take(row_cap) {
        let record = record.map_err(malformed)?;
        rows.push(RawRecord::new(record.iter().map(str::to_string).collect()));
    }

    Ok(RawTable::new(headers, rows))
}
