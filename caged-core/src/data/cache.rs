//! Flat on-disk archive cache.
//!
//! Layout: `{cache_dir}/CAGEDMOV{YYYYMM}.7z` and `{cache_dir}/CAGEDMOV{YYYYMM}.txt`.
//! File names are the only index. Entries are never invalidated or evicted
//! by the pipeline; cleanup is manual.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{ReferenceMonth, ARCHIVE_PREFIX};

pub struct ArchiveCache {
    cache_dir: PathBuf,
}

impl ArchiveCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/CAGEDMOV{YYYYMM}.7z`
    pub fn archive_path(&self, month: ReferenceMonth) -> PathBuf {
        self.cache_dir.join(month.archive_file_name())
    }

    /// `{cache_dir}/CAGEDMOV{YYYYMM}.txt`
    pub fn flat_file_path(&self, month: ReferenceMonth) -> PathBuf {
        self.cache_dir.join(month.flat_file_name())
    }

    /// Every month with an archive or extracted file in the cache, ascending.
    pub fn status(&self) -> io::Result<Vec<CacheStatus>> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut by_month: BTreeMap<ReferenceMonth, CacheStatus> = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some((month, kind)) = parse_cache_name(&name) else {
                continue;
            };
            let size = entry.metadata()?.len();
            let status = by_month.entry(month).or_insert(CacheStatus {
                month,
                archive_bytes: None,
                flat_file_bytes: None,
            });
            match kind {
                CacheFileKind::Archive => status.archive_bytes = Some(size),
                CacheFileKind::FlatFile => status.flat_file_bytes = Some(size),
            }
        }

        Ok(by_month.into_values().collect())
    }
}

/// Cache contents for a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub month: ReferenceMonth,
    pub archive_bytes: Option<u64>,
    pub flat_file_bytes: Option<u64>,
}

enum CacheFileKind {
    Archive,
    FlatFile,
}

fn parse_cache_name(name: &str) -> Option<(ReferenceMonth, CacheFileKind)> {
    let rest = name.strip_prefix(ARCHIVE_PREFIX)?;
    let (token, kind) = if let Some(token) = rest.strip_suffix(".7z") {
        (token, CacheFileKind::Archive)
    } else if let Some(token) = rest.strip_suffix(".txt") {
        (token, CacheFileKind::FlatFile)
    } else {
        return None;
    };
    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = token[..4].parse().ok()?;
    let month = token[4..].parse().ok()?;
    ReferenceMonth::new(year, month).ok().map(|m| (m, kind))
}
