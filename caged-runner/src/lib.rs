//! CAGED Runner: window aggregation, session state, summaries, export.
//!
//! This crate builds on `caged-core` to provide:
//! - `PipelineConfig` loaded from TOML
//! - The historical aggregator with partial-success diagnostics
//! - `ArchivePipeline`, the production per-month source
//! - `Session`, the owned state of the last window build
//! - Dashboard summaries (KPIs, rankings, trend) over Polars
//! - Parquet and JSON export

pub mod config;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod session;
pub mod summary;

pub use config::{ConfigError, PipelineConfig, DEFAULT_WINDOW_SIZE};
pub use export::{export_parquet, read_parquet, write_report, ExportError};
pub use history::{
    build_window, Diagnostic, MonthSource, NoProgress, ProgressReporter, Stage, StderrProgress,
    WindowResult,
};
pub use pipeline::ArchivePipeline;
pub use session::Session;
pub use summary::{
    format_brl, pick_city, CityReport, LabelCount, LabelValue, MonthKpis, SummaryError,
    TrendPoint, DEFAULT_CITY,
};
