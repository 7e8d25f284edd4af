//! Artifact export: Parquet dataset and JSON report.
//!
//! Both writers go through a `.tmp` sibling and rename into place, so a
//! reader never observes a half-written artifact.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use caged_core::domain::HistoricalDataset;

use crate::summary::CityReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet write failed: {0}")]
    Parquet(#[from] PolarsError),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the dataset's canonical DataFrame to `path`; returns the row count.
pub fn export_parquet(dataset: &HistoricalDataset, path: &Path) -> Result<usize, ExportError> {
    let mut df = dataset.to_dataframe()?;
    let tmp = tmp_path(path);
    prepare_parent(path)?;

    let written = fs::File::create(&tmp)
        .map_err(|source| io_err(&tmp, source))
        .and_then(|file| {
            ParquetWriter::new(file).finish(&mut df)?;
            Ok(())
        });
    commit(written, &tmp, path)?;
    Ok(df.height())
}

/// Write `report` as pretty JSON to `path`.
pub fn write_report(report: &CityReport, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)?;
    let tmp = tmp_path(path);
    prepare_parent(path)?;

    let written = fs::write(&tmp, json).map_err(|source| io_err(&tmp, source));
    commit(written, &tmp, path)
}

/// Read back a Parquet export.
pub fn read_parquet(path: &Path) -> Result<DataFrame, ExportError> {
    let file = fs::File::open(path).map_err(|source| io_err(path, source))?;
    Ok(ParquetReader::new(file).finish()?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn prepare_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| io_err(parent, source))
        }
        _ => Ok(()),
    }
}

/// Rename `tmp` over `path` if the write succeeded; remove `tmp` otherwise.
fn commit(written: Result<(), ExportError>, tmp: &Path, path: &Path) -> Result<(), ExportError> {
    let result = written.and_then(|()| fs::rename(tmp, path).map_err(|source| io_err(path, source)));
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

fn io_err(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}
