//! Archive fetcher: cache-first retrieval of monthly CAGED archives.
//!
//! Remote layout: `{base}/{year}/{YYYYMM}/CAGEDMOV{YYYYMM}.7z`.
//!
//! - A cached archive is returned as-is, with no network activity and no
//!   freshness or integrity check. Archives are immutable once downloaded.
//! - Downloads land in `{name}.7z.part` and are renamed into place only
//!   after the transfer completes; the part file is removed on any failure.

use reqwest::Url;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::cache::ArchiveCache;
use super::error::{FetchError, TransportError};
use super::transport::{transport_for, ArchiveTransport};
use crate::domain::ReferenceMonth;

/// Default remote root of the "Novo CAGED" microdata.
pub const DEFAULT_BASE_URL: &str = "ftp://ftp.mtps.gov.br/pdet/microdados/NOVO%20CAGED";

/// Where one month's archive lives, remotely and locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyArchive {
    pub month: ReferenceMonth,
    pub remote_url: Url,
    pub archive_path: PathBuf,
    pub flat_file_path: PathBuf,
}

pub struct ArchiveFetcher {
    base_url: Url,
    cache: ArchiveCache,
    transport: Box<dyn ArchiveTransport>,
}

impl ArchiveFetcher {
    pub fn new(base_url: Url, cache: ArchiveCache, transport: Box<dyn ArchiveTransport>) -> Self {
        Self {
            base_url,
            cache,
            transport,
        }
    }

    /// Build a fetcher whose transport is chosen from the base URL's scheme.
    pub fn from_base_url(
        base_url: &str,
        cache_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
        let transport = transport_for(&base_url, timeout)?;
        Ok(Self::new(base_url, ArchiveCache::new(cache_dir), transport))
    }

    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// `{base}/{year}/{YYYYMM}/CAGEDMOV{YYYYMM}.7z`
    pub fn remote_url(&self, month: ReferenceMonth) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = format!(
            "{base}/{}/{}/{}",
            month.year(),
            month.token(),
            month.archive_file_name()
        );
        Url::parse(&url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))
    }

    /// Remote URL and cache paths for `month`; touches neither the network nor the disk.
    pub fn archive(&self, month: ReferenceMonth) -> Result<MonthlyArchive, TransportError> {
        Ok(MonthlyArchive {
            month,
            remote_url: self.remote_url(month)?,
            archive_path: self.cache.archive_path(month),
            flat_file_path: self.cache.flat_file_path(month),
        })
    }

    /// Return the local archive for `month`, downloading it if not cached.
    pub fn fetch(&self, month: ReferenceMonth) -> Result<PathBuf, FetchError> {
        let local = self.cache.archive_path(month);
        if local.is_file() {
            info!(%month, path = %local.display(), "archive cached, skipping download");
            return Ok(local);
        }

        let url = self.remote_url(month).map_err(|e| FetchError::new(month, e))?;
        fs::create_dir_all(self.cache.cache_dir()).map_err(|e| FetchError::new(month, e))?;

        info!(%month, %url, transport = self.transport.name(), "downloading archive");
        let part = part_path(&local);
        match self.download_to(&url, &part) {
            Ok(0) => {
                discard(&part);
                Err(FetchError::new(
                    month,
                    TransportError::Protocol(format!("empty transfer from {url}")),
                ))
            }
            Ok(bytes) => {
                fs::rename(&part, &local).map_err(|e| {
                    discard(&part);
                    FetchError::new(month, e)
                })?;
                info!(%month, bytes, "archive downloaded");
                Ok(local)
            }
            Err(e) => {
                discard(&part);
                Err(FetchError::new(month, e))
            }
        }
    }

    fn download_to(&self, url: &Url, part: &Path) -> Result<u64, TransportError> {
        let file = File::create(part)?;
        let mut writer = BufWriter::new(file);
        let bytes = self.transport.retrieve(url, &mut writer)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| TransportError::Io(e.into_error()))?
            .sync_all()?;
        Ok(bytes)
    }
}

fn part_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn discard(part: &Path) {
    if let Err(e) = fs::remove_file(part) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %part.display(), error = %e, "failed to remove partial download");
        }
    }
}
