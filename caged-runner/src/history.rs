//! Historical aggregation: builds a dataset from a window of monthly releases.
//!
//! Months are processed one at a time, newest first. Each month runs the
//! full fetch → extract → load → normalize chain independently; a failure
//! in any stage becomes a [`Diagnostic`] and the next month is attempted.
//! Partial windows are the normal outcome, since recent releases are often
//! not yet published.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use caged_core::data::StageError;
use caged_core::domain::{CanonicalRecord, HistoricalDataset, ReferenceMonth};

/// Produces the canonical records for one month.
///
/// The production implementation is [`crate::pipeline::ArchivePipeline`];
/// tests substitute scripted sources.
pub trait MonthSource {
    fn load_month(&self, month: ReferenceMonth) -> Result<Vec<CanonicalRecord>, StageError>;
}

/// Receives `(fraction_complete, label)` updates during a window build.
pub trait ProgressReporter {
    fn report(&self, fraction: f64, label: &str);
}

/// Discards all progress updates.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _fraction: f64, _label: &str) {}
}

/// Prints progress lines to stderr, keeping stdout free for results.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, fraction: f64, label: &str) {
        eprintln!("[{:>3.0}%] {label}", fraction * 100.0);
    }
}

impl<F> ProgressReporter for F
where
    F: Fn(f64, &str),
{
    fn report(&self, fraction: f64, label: &str) {
        self(fraction, label)
    }
}

/// Pipeline stage a month failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Extract,
    Load,
    Schema,
    /// All stages succeeded but the month yielded no rows.
    Empty,
}

impl Stage {
    pub fn of(err: &StageError) -> Self {
        match err {
            StageError::Fetch(_) => Stage::Fetch,
            StageError::Extraction(_) => Stage::Extract,
            StageError::Parse(_) => Stage::Load,
            StageError::Schema(_) => Stage::Schema,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Load => "load",
            Stage::Schema => "schema",
            Stage::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Why one month contributed nothing to the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub year: i32,
    pub month: u32,
    pub stage: Stage,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(month: ReferenceMonth, stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            year: month.year(),
            month: month.month(),
            stage,
            reason: reason.into(),
        }
    }

    fn from_error(month: ReferenceMonth, err: &StageError) -> Self {
        Self::new(month, Stage::of(err), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02} [{}] {}",
            self.year, self.month, self.stage, self.reason
        )
    }
}

/// Outcome of a window build.
///
/// `dataset` is `None` only when no month produced rows; in that case there
/// is one diagnostic per requested month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowResult {
    pub dataset: Option<HistoricalDataset>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WindowResult {
    pub fn has_data(&self) -> bool {
        self.dataset.is_some()
    }
}

/// Build the dataset for the `window_size` months ending at `end`.
pub fn build_window(
    source: &dyn MonthSource,
    end: ReferenceMonth,
    window_size: usize,
    progress: &dyn ProgressReporter,
) -> WindowResult {
    if window_size == 0 {
        return WindowResult::default();
    }

    let months = end.window_back(window_size);
    let mut dataset = HistoricalDataset::default();
    let mut diagnostics = Vec::new();
    let mut loaded = 0usize;

    for (i, month) in months.iter().copied().enumerate() {
        progress.report(i as f64 / window_size as f64, &format!("loading {month}"));

        match source.load_month(month) {
            Ok(records) if records.is_empty() => {
                warn!(%month, "month produced no rows");
                diagnostics.push(Diagnostic::new(month, Stage::Empty, "no rows after normalization"));
            }
            Ok(records) => {
                info!(%month, rows = records.len(), "month loaded");
                dataset.extend(records);
                loaded += 1;
            }
            Err(e) => {
                warn!(%month, stage = %Stage::of(&e), error = %e, "month skipped");
                diagnostics.push(Diagnostic::from_error(month, &e));
            }
        }
    }
    progress.report(1.0, "done");

    info!(
        %end,
        window_size,
        loaded,
        failed = diagnostics.len(),
        rows = dataset.len(),
        "window built"
    );

    WindowResult {
        dataset: (loaded > 0).then_some(dataset),
        diagnostics,
    }
}
