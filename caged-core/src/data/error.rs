//! Structured error types for the pipeline stages.
//!
//! One error type per stage so each stage's contract is visible in its
//! signature; [`StageError`] unifies them for the orchestration layer.
//! Messages are written to be shown as-is in CLI output and diagnostics.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::ReferenceMonth;

/// Failure inside an archive transport (FTP, FTPS, HTTP mirror).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("remote file not found: {0}")]
    NotFound(String),

    #[error("transfer timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("unsupported URL scheme '{0}' (expected ftp, ftps, http or https)")]
    UnsupportedScheme(String),

    #[error("invalid remote URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The archive for a month could not be retrieved.
#[derive(Debug, Error)]
#[error("fetch failed for {month}: {cause}")]
pub struct FetchError {
    pub month: ReferenceMonth,
    #[source]
    pub cause: TransportError,
}

impl FetchError {
    pub fn new(month: ReferenceMonth, cause: impl Into<TransportError>) -> Self {
        Self {
            month,
            cause: cause.into(),
        }
    }
}

/// The archive could not be turned into a flat file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("archive name {} carries no YYYYMM token", .0.display())]
    UnrecognizedArchiveName(PathBuf),

    #[error("failed to decompress {}: {reason}", .archive.display())]
    Decompress { archive: PathBuf, reason: String },

    #[error("extraction of {} timed out after {}s", .archive.display(), .after.as_secs())]
    Timeout { archive: PathBuf, after: Duration },

    #[error("archive {} contained no file matching *{token}*.txt", .archive.display())]
    NoMatchingFile { archive: PathBuf, token: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The flat file could not be parsed as semicolon-delimited text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no header row", .path.display())]
    MissingHeader { path: PathBuf },

    #[error("malformed record in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// An essential canonical field could not be resolved from the release's columns.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no balance column found among {columns:?}")]
    MissingBalance { columns: Vec<String> },
}

/// Any failure of one month's Fetch → Extract → Load → Normalize run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
