//! Production month source: fetch → extract → load → normalize.

use std::path::PathBuf;
use tracing::debug;

use caged_core::data::{
    load, normalize, ArchiveExtractor, ArchiveFetcher, StageError, TransportError,
};
use caged_core::domain::{CanonicalRecord, ReferenceMonth};

use crate::config::PipelineConfig;
use crate::history::MonthSource;

/// Runs every stage for one month against the local cache.
pub struct ArchivePipeline {
    fetcher: ArchiveFetcher,
    extractor: ArchiveExtractor,
    row_cap: usize,
}

impl ArchivePipeline {
    pub fn new(fetcher: ArchiveFetcher, extractor: ArchiveExtractor, row_cap: usize) -> Self {
        Self {
            fetcher,
            extractor,
            row_cap,
        }
    }

    /// Fails only when the configured base URL is unusable.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, TransportError> {
        let fetcher = ArchiveFetcher::from_base_url(
            &config.base_url,
            config.cache_dir.clone(),
            config.fetch_timeout(),
        )?;
        let extractor = ArchiveExtractor::new(config.extract_timeout());
        Ok(Self::new(fetcher, extractor, config.row_cap))
    }

    pub fn fetcher(&self) -> &ArchiveFetcher {
        &self.fetcher
    }

    /// Fetch and extract `month`, returning the flat file path.
    pub fn prepare(&self, month: ReferenceMonth) -> Result<PathBuf, StageError> {
        let archive = self.fetcher.fetch(month)?;
        let flat = self
            .extractor
            .extract(&archive, self.fetcher.cache().cache_dir())?;
        Ok(flat)
    }
}

impl MonthSource for ArchivePipeline {
    fn load_month(&self, month: ReferenceMonth) -> Result<Vec<CanonicalRecord>, StageError> {
        let flat = self.prepare(month)?;
        let table = load(&flat, self.row_cap)?;
        let records = normalize(&table, month)?;
        debug!(%month, raw = table.len(), canonical = records.len(), "month normalized");
        Ok(records)
    }
}
