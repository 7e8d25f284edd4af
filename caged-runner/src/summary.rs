//! Dashboard summaries for one city and month.
//!
//! All aggregations are Polars lazy queries over the canonical DataFrame.
//! "Admission" means `balance == 1` and "termination" `balance == -1`;
//! other balance values count toward the total only. Wage statistics use
//! admissions with a positive wage. Rankings break ties alphabetically.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use caged_core::domain::{HistoricalDataset, ReferenceMonth};

use crate::history::Diagnostic;

/// City shown when none is requested and it is present in the data.
pub const DEFAULT_CITY: &str = "Canoas (RS)";

pub const SECTOR_VOLUME_LIMIT: usize = 8;
pub const WAGE_RANKING_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("dataset has no municipality labels to summarize")]
    NoCities,

    #[error("city '{0}' is not present in the loaded window")]
    UnknownCity(String),

    #[error("aggregation failed: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

/// Net balance of one reference month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub net: i64,
}

/// Headline numbers for one city and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthKpis {
    pub total: u64,
    pub admissions: u64,
    pub terminations: u64,
    /// `admissions - terminations`
    pub net: i64,
    /// Sector with the most admissions.
    pub top_sector: Option<String>,
    /// Sector with the highest mean admission wage, with that mean.
    pub best_paying: Option<LabelValue>,
}

/// Everything the dashboard shows for one selection, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityReport {
    pub city: String,
    pub month: ReferenceMonth,
    pub kpis: MonthKpis,
    pub sector_volume: Vec<LabelCount>,
    pub gender_profile: Vec<LabelCount>,
    pub balance_trend: Vec<TrendPoint>,
    pub wage_ranking: Vec<LabelValue>,
    pub diagnostics: Vec<Diagnostic>,
    pub dataset_rows: usize,
    pub dataset_fingerprint: String,
}

impl CityReport {
    pub fn build(
        dataset: &HistoricalDataset,
        city: &str,
        month: ReferenceMonth,
        diagnostics: &[Diagnostic],
    ) -> Result<Self, SummaryError> {
        let df = dataset.to_dataframe()?;
        Ok(Self {
            city: city.to_string(),
            month,
            kpis: month_kpis(&df, city, month)?,
            sector_volume: sector_volume(&df, city, month)?,
            gender_profile: gender_profile(&df, city, month)?,
            balance_trend: balance_trend(&df, city)?,
            wage_ranking: wage_ranking(&df, city, month)?,
            diagnostics: diagnostics.to_vec(),
            dataset_rows: dataset.len(),
            dataset_fingerprint: dataset.fingerprint(),
        })
    }
}

/// The requested city if present, else [`DEFAULT_CITY`] if present, else the
/// first city in sorted order.
pub fn pick_city(dataset: &HistoricalDataset, requested: Option<&str>) -> Result<String, SummaryError> {
    let cities = dataset.municipalities();
    if let Some(city) = requested {
        return if cities.iter().any(|c| c == city) {
            Ok(city.to_string())
        } else {
            Err(SummaryError::UnknownCity(city.to_string()))
        };
    }
    cities
        .iter()
        .find(|c| c.as_str() == DEFAULT_CITY)
        .or_else(|| cities.first())
        .cloned()
        .ok_or(SummaryError::NoCities)
}

pub fn month_kpis(df: &DataFrame, city: &str, month: ReferenceMonth) -> PolarsResult<MonthKpis> {
    let counts = month_frame(df, city, month)
        .select([
            col("balance").count().cast(DataType::UInt64).alias("total"),
            col("balance")
                .eq(lit(1i64))
                .cast(DataType::UInt64)
                .sum()
                .alias("admissions"),
            col("balance")
                .eq(lit(-1i64))
                .cast(DataType::UInt64)
                .sum()
                .alias("terminations"),
        ])
        .collect()?;

    let admissions = first_u64(&counts, "admissions")?;
    let terminations = first_u64(&counts, "terminations")?;

    Ok(MonthKpis {
        total: first_u64(&counts, "total")?,
        admissions,
        terminations,
        net: admissions as i64 - terminations as i64,
        top_sector: sector_volume(df, city, month)?
            .into_iter()
            .next()
            .map(|s| s.label),
        best_paying: wage_ranking(df, city, month)?.into_iter().next(),
    })
}

/// Admissions per sector, largest first, at most [`SECTOR_VOLUME_LIMIT`].
pub fn sector_volume(df: &DataFrame, city: &str, month: ReferenceMonth) -> PolarsResult<Vec<LabelCount>> {
    let out = admissions(month_frame(df, city, month))
        .filter(col("sector").is_not_null())
        .group_by([col("sector")])
        .agg([col("balance").count().alias("count")])
        .sort_by_exprs([col("count"), col("sector")], descending_then_label())
        .limit(SECTOR_VOLUME_LIMIT as IdxSize)
        .collect()?;
    label_counts(&out, "sector")
}

/// Admissions per gender label, largest first.
pub fn gender_profile(df: &DataFrame, city: &str, month: ReferenceMonth) -> PolarsResult<Vec<LabelCount>> {
    let out = admissions(month_frame(df, city, month))
        .filter(col("gender").is_not_null())
        .group_by([col("gender")])
        .agg([col("balance").count().alias("count")])
        .sort_by_exprs([col("count"), col("gender")], descending_then_label())
        .collect()?;
    label_counts(&out, "gender")
}

/// Net balance per month across the whole window, oldest first.
pub fn balance_trend(df: &DataFrame, city: &str) -> PolarsResult<Vec<TrendPoint>> {
    let out = city_frame(df, city)
        .group_by([col("reference_month")])
        .agg([col("balance").sum().alias("net")])
        .sort_by_exprs([col("reference_month")], SortMultipleOptions::default())
        .collect()?;

    let months = out.column("reference_month")?.as_materialized_series().str()?;
    let nets = out
        .column("net")?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    let nets = nets.i64()?;

    Ok(months
        .into_iter()
        .zip(nets)
        .filter_map(|(month, net)| {
            Some(TrendPoint {
                month: month?.to_string(),
                net: net.unwrap_or(0),
            })
        })
        .collect())
}

/// Mean admission wage per sector, highest first, at most [`WAGE_RANKING_LIMIT`].
pub fn wage_ranking(df: &DataFrame, city: &str, month: ReferenceMonth) -> PolarsResult<Vec<LabelValue>> {
    let out = admissions(month_frame(df, city, month))
        .filter(col("wage").gt(lit(0.0)).and(col("sector").is_not_null()))
        .group_by([col("sector")])
        .agg([col("wage").mean().alias("value")])
        .sort_by_exprs([col("value"), col("sector")], descending_then_label())
        .limit(WAGE_RANKING_LIMIT as IdxSize)
        .collect()?;

    let labels = out.column("sector")?.as_materialized_series().str()?;
    let values = out.column("value")?.as_materialized_series().f64()?;

    Ok(labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, value)| {
            Some(LabelValue {
                label: label?.to_string(),
                value: value?,
            })
        })
        .collect())
}

/// Brazilian currency formatting without the symbol: `1234.5` → `1.234,50`.
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return "0,00".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped},{frac}")
}

fn city_frame(df: &DataFrame, city: &str) -> LazyFrame {
    df.clone().lazy().filter(col("municipality").eq(lit(city)))
}

fn month_frame(df: &DataFrame, city: &str, month: ReferenceMonth) -> LazyFrame {
    city_frame(df, city).filter(col("reference_month").eq(lit(month.to_string())))
}

fn admissions(frame: LazyFrame) -> LazyFrame {
    frame.filter(col("balance").eq(lit(1i64)))
}

fn descending_then_label() -> SortMultipleOptions {
    SortMultipleOptions::default().with_order_descending_multi([true, false])
}

fn label_counts(df: &DataFrame, label: &str) -> PolarsResult<Vec<LabelCount>> {
    let labels = df.column(label)?.as_materialized_series().str()?;
    let counts = df
        .column("count")?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    Ok(labels
        .into_iter()
        .zip(counts)
        .filter_map(|(label, count)| {
            Some(LabelCount {
                label: label?.to_string(),
                count: count.unwrap_or(0),
            })
        })
        .collect())
}

fn first_u64(df: &DataFrame, name: &str) -> PolarsResult<u64> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    Ok(series.u64()?.get(0).unwrap_or(0))
}
