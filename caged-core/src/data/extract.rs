//! 7z archive extraction into the flat cache directory.
//!
//! Extraction is skipped when `target_dir` already holds a `.txt` file whose
//! name contains the archive's `YYYYMM` token. Otherwise the archive is
//! decompressed into a hidden staging directory and only the `.txt` entries
//! carrying the token are moved up into `target_dir`, so an interrupted
//! extraction never leaves a half-written file where the scan would find it.
//! Other entries are dropped with the staging directory; a stray flat file
//! for another month would otherwise shadow that month's own archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::error::ExtractionError;

/// Suffix of the flat files inside the monthly archives.
pub const FLAT_FILE_SUFFIX: &str = ".txt";

pub struct ArchiveExtractor {
    timeout: Duration,
}

impl ArchiveExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Return the flat file extracted from `archive`, extracting it into `target_dir` if needed.
    pub fn extract(&self, archive: &Path, target_dir: &Path) -> Result<PathBuf, ExtractionError> {
        let token = archive_token(archive)
            .ok_or_else(|| ExtractionError::UnrecognizedArchiveName(archive.to_path_buf()))?;

        if let Some(existing) = find_flat_file(target_dir, &token).map_err(|e| io_err(target_dir, e))? {
            info!(path = %existing.display(), "flat file already extracted");
            return Ok(existing);
        }

        let staging = target_dir.join(format!(".extract-{token}"));
        reset_dir(&staging)?;

        info!(archive = %archive.display(), "extracting archive");
        let outcome = self.decompress(archive, &staging);
        let moved = outcome.and_then(|()| promote_flat_files(&staging, target_dir, &token));
        if let Err(e) = fs::remove_dir_all(&staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %e, "failed to remove staging directory");
            }
        }
        moved?;

        find_flat_file(target_dir, &token)
            .map_err(|e| io_err(target_dir, e))?
            .ok_or_else(|| ExtractionError::NoMatchingFile {
                archive: archive.to_path_buf(),
                token,
            })
    }

    /// Run the decompressor on a helper thread so the caller can give up at the timeout.
    ///
    /// On timeout the helper keeps writing into the staging directory, which
    /// is never scanned; the next attempt for the month resets it.
    fn decompress(&self, archive: &Path, staging: &Path) -> Result<(), ExtractionError> {
        let (tx, rx) = mpsc::channel();
        let src = archive.to_path_buf();
        let dest = staging.to_path_buf();
        thread::spawn(move || {
            let result = sevenz_rust::decompress_file(&src, &dest).map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(ExtractionError::Decompress {
                archive: archive.to_path_buf(),
                reason,
            }),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ExtractionError::Timeout {
                archive: archive.to_path_buf(),
                after: self.timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ExtractionError::Decompress {
                archive: archive.to_path_buf(),
                reason: "decompressor thread panicked".into(),
            }),
        }
    }
}

/// The first 6-digit run in the archive's file name, e.g. `202403`.
pub fn archive_token(archive: &Path) -> Option<String> {
    let name = archive.file_name()?.to_str()?;
    let bytes = name.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            let s = *start.get_or_insert(i);
            if i + 1 - s == 6 && bytes.get(i + 1).map_or(true, |n| !n.is_ascii_digit()) {
                return Some(name[s..=i].to_string());
            }
        } else {
            start = None;
        }
    }
    None
}

/// Lexically first `*{token}*.txt` file directly inside `dir`.
///
/// More than one match is ambiguous; the first is used and a warning logged.
pub fn find_flat_file(dir: &Path, token: &str) -> io::Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_flat_file_for(&name, token) {
            matches.push(name);
        }
    }
    matches.sort();

    if matches.len() > 1 {
        warn!(
            token,
            candidates = ?matches,
            "multiple flat files match; using the first in lexical order"
        );
    }
    Ok(matches.into_iter().next().map(|name| dir.join(name)))
}

fn is_flat_file_for(name: &str, token: &str) -> bool {
    name.contains(token) && name.ends_with(FLAT_FILE_SUFFIX)
}

fn reset_dir(dir: &Path) -> Result<(), ExtractionError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(dir, e)),
    }
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
}

/// Move the `*{token}*.txt` files found under `staging` (at any depth) into `target_dir`.
fn promote_flat_files(
    staging: &Path,
    target_dir: &Path,
    token: &str,
) -> Result<(), ExtractionError> {
    let mut pending = vec![staging.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if is_flat_file_for(&entry.file_name().to_string_lossy(), token) {
                let dest = target_dir.join(entry.file_name());
                fs::rename(&path, &dest).map_err(|e| io_err(&dest, e))?;
            }
        }
    }
    Ok(())
}

fn io_err(path: &Path, source: io::Error) -> ExtractionError {
    ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    }
}
