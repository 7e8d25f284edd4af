//! Domain types for the CAGED pipeline

pub mod dataset;
pub mod month;
pub mod record;

pub use dataset::HistoricalDataset;
pub use month::{MonthError, ReferenceMonth, ARCHIVE_PREFIX};
pub use record::{CanonicalRecord, RawRecord, RawTable};
