//! ReferenceMonth: the (year, month) a CAGED release represents.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by every monthly movement archive and its extracted file.
pub const ARCHIVE_PREFIX: &str = "CAGEDMOV";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthError {
    #[error("invalid reference month {year}-{month}: month must be in 1..=12")]
    OutOfRange { year: i32, month: u32 },

    #[error("cannot parse reference month '{0}' (expected YYYY-MM)")]
    Unparseable(String),
}

/// A calendar month identifying one monthly release.
///
/// Ordering is chronological. Displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceMonth {
    year: i32,
    month: u32,
}

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, MonthError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(MonthError::OutOfRange { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Year plus zero-padded month, e.g. `202403`. Used in remote paths and file names.
    pub fn token(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// `CAGEDMOV<YYYYMM>.7z`
    pub fn archive_file_name(&self) -> String {
        format!("{ARCHIVE_PREFIX}{}.7z", self.token())
    }

    /// `CAGEDMOV<YYYYMM>.txt`
    pub fn flat_file_name(&self) -> String {
        format!("{ARCHIVE_PREFIX}{}.txt", self.token())
    }

    /// The calendar month immediately before this one (January wraps to December).
    pub fn previous(&self) -> Self {
        let first = self.first_day();
        match first.checked_sub_months(Months::new(1)) {
            Some(prev) => Self {
                year: prev.year(),
                month: prev.month(),
            },
            // Only reachable at chrono's minimum supported year.
            None => *self,
        }
    }

    /// `size` consecutive months ending at `self`, newest first.
    pub fn window_back(&self, size: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(size);
        let mut current = *self;
        for _ in 0..size {
            months.push(current);
            current = current.previous();
        }
        months
    }

    fn first_day(&self) -> NaiveDate {
        // Validated in `new`.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReferenceMonth {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| MonthError::Unparseable(s.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| MonthError::Unparseable(s.to_string()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| MonthError::Unparseable(s.to_string()))?;
        Self::new(year, month)
    }
}
