//! Session: the currently loaded window, owned by the presentation layer.

use caged_core::domain::{HistoricalDataset, ReferenceMonth};

use crate::history::{build_window, Diagnostic, MonthSource, ProgressReporter, WindowResult};

/// Holds the dataset and diagnostics of the last window build.
///
/// Each [`Session::load`] replaces the previous state wholesale.
#[derive(Debug, Default)]
pub struct Session {
    end: Option<ReferenceMonth>,
    window_size: usize,
    result: WindowResult,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the session for the window ending at `end`; returns whether any month loaded.
    pub fn load(
        &mut self,
        source: &dyn MonthSource,
        end: ReferenceMonth,
        window_size: usize,
        progress: &dyn ProgressReporter,
    ) -> bool {
        self.result = build_window(source, end, window_size, progress);
        self.end = Some(end);
        self.window_size = window_size;
        self.result.has_data()
    }

    pub fn dataset(&self) -> Option<&HistoricalDataset> {
        self.result.dataset.as_ref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.result.diagnostics
    }

    /// End month of the loaded window, if any load happened.
    pub fn end_month(&self) -> Option<ReferenceMonth> {
        self.end
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
