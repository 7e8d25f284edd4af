//! Dashboard summaries and exported artifacts over a hand-built fixture.
//!
//! Fixture (Canoas, 2024-03):
//! - Comércio: 3 admissions (wages 2000, 2200, 0), 1 termination
//! - Saúde: 2 admissions (wages 4000, 5000)
//! - Indústria: 1 admission (wage 1800), 2 terminations
//! - one balance-0 row
//!
//! Plus Canoas 2024-02 (net −1) and Porto Alegre 2024-03 rows that must
//! not leak into the Canoas month figures.

use std::fs;

use caged_core::data::normalize;
use caged_core::domain::{CanonicalRecord, HistoricalDataset, RawRecord, RawTable, ReferenceMonth};
use caged_runner::{
    export_parquet, pick_city, read_parquet, write_report, CityReport, Diagnostic, Stage,
    SummaryError,
};

// ──────────────────────────────────────────────
// Fixture
// ──────────────────────────────────────────────

fn row(month: u32, city: &str, sector: &str, gender: &str, balance: i64, wage: f64) -> CanonicalRecord {
    CanonicalRecord {
        reference_month: ReferenceMonth::new(2024, month).unwrap(),
        balance,
        wage,
        municipality_code: Some("000000".into()),
        municipality: Some(city.into()),
        industry_section_code: Some("X".into()),
        sector: Some(sector.into()),
        gender_code: Some("0".into()),
        gender: Some(gender.into()),
    }
}

fn fixture() -> HistoricalDataset {
    let c = "Canoas (RS)";
    HistoricalDataset::new(vec![
        row(3, c, "Comércio", "Masculino", 1, 2000.0),
        row(3, c, "Comércio", "Feminino", 1, 2200.0),
        row(3, c, "Comércio", "Feminino", 1, 0.0),
        row(3, c, "Comércio", "Masculino", -1, 1900.0),
        row(3, c, "Saúde", "Feminino", 1, 4000.0),
        row(3, c, "Saúde", "Feminino", 1, 5000.0),
        row(3, c, "Indústria", "Masculino", 1, 1800.0),
        row(3, c, "Indústria", "Masculino", -1, 2500.0),
        row(3, c, "Indústria", "Masculino", -1, 2500.0),
        row(3, c, "Indústria", "Masculino", 0, 0.0),
        row(2, c, "Comércio", "Masculino", -1, 0.0),
        row(3, "Porto Alegre (RS)", "Saúde", "Masculino", 1, 9000.0),
    ])
}

fn march() -> ReferenceMonth {
    ReferenceMonth::new(2024, 3).unwrap()
}

fn report() -> CityReport {
    let diagnostics = vec![Diagnostic::new(
        ReferenceMonth::new(2024, 1).unwrap(),
        Stage::Fetch,
        "remote file not found",
    )];
    CityReport::build(&fixture(), "Canoas (RS)", march(), &diagnostics).unwrap()
}

// ──────────────────────────────────────────────
// Summaries
// ──────────────────────────────────────────────

#[test]
fn kpis_match_hand_computed_values() {
    let kpis = report().kpis;
    assert_eq!(kpis.total, 10);
    assert_eq!(kpis.admissions, 6);
    assert_eq!(kpis.terminations, 3);
    assert_eq!(kpis.net, 3);
    assert_eq!(kpis.top_sector.as_deref(), Some("Comércio"));

    let best = kpis.best_paying.expect("wages present");
    assert_eq!(best.label, "Saúde");
    assert!((best.value - 4500.0).abs() < 1e-9);
}

#[test]
fn rankings_are_sorted_and_scoped_to_city_month() {
    let r = report();

    let volume: Vec<_> = r.sector_volume.iter().map(|s| (s.label.as_str(), s.count)).collect();
    assert_eq!(volume, vec![("Comércio", 3), ("Saúde", 2), ("Indústria", 1)]);

    let genders: Vec<_> = r.gender_profile.iter().map(|g| (g.label.as_str(), g.count)).collect();
    assert_eq!(genders, vec![("Feminino", 4), ("Masculino", 2)]);

    let wages: Vec<_> = r.wage_ranking.iter().map(|w| w.label.as_str()).collect();
    assert_eq!(wages, vec!["Saúde", "Comércio", "Indústria"]);
    assert!((r.wage_ranking[1].value - 2100.0).abs() < 1e-9);
}

#[test]
fn trend_covers_every_month_of_the_city() {
    let trend = report().balance_trend;
    let points: Vec<_> = trend.iter().map(|p| (p.month.as_str(), p.net)).collect();
    assert_eq!(points, vec![("2024-02", -1), ("2024-03", 3)]);
}

#[test]
fn month_without_rows_gives_zero_kpis() {
    let r = CityReport::build(
        &fixture(),
        "Canoas (RS)",
        ReferenceMonth::new(2023, 12).unwrap(),
        &[],
    )
    .unwrap();
    assert_eq!(r.kpis.total, 0);
    assert_eq!(r.kpis.net, 0);
    assert!(r.kpis.top_sector.is_none());
    assert!(r.kpis.best_paying.is_none());
    assert!(r.sector_volume.is_empty());
}

#[test]
fn default_city_prefers_canoas() {
    assert_eq!(pick_city(&fixture(), None).unwrap(), "Canoas (RS)");

    let elsewhere = fixture().slice(Some("Porto Alegre (RS)"), None);
    assert_eq!(pick_city(&elsewhere, None).unwrap(), "Porto Alegre (RS)");

    assert!(matches!(
        pick_city(&fixture(), Some("Recife (PE)")),
        Err(SummaryError::UnknownCity(_))
    ));
}

#[test]
fn blank_municipality_is_never_the_default_city() {
    let table = RawTable::new(
        vec!["saldomovimentacao".into(), "municipio".into()],
        vec![
            RawRecord::new(vec!["1".into(), "".into()]),
            RawRecord::new(vec!["-1".into(), "431490".into()]),
        ],
    );
    let dataset = HistoricalDataset::new(normalize(&table, march()).unwrap());

    assert_eq!(dataset.municipalities(), vec!["Porto Alegre (RS)".to_string()]);
    assert_eq!(pick_city(&dataset, None).unwrap(), "Porto Alegre (RS)");
}

// ──────────────────────────────────────────────
// Artifacts
// ──────────────────────────────────────────────

#[test]
fn parquet_export_round_trips_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("window.parquet");

    let rows = export_parquet(&fixture(), &path).unwrap();
    assert_eq!(rows, 12);

    let df = read_parquet(&path).unwrap();
    assert_eq!(df.height(), 12);
    let balance_sum: i64 = df
        .column("balance")
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .sum();
    assert_eq!(balance_sum, 3 - 1 + 1);

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn json_report_carries_kpis_and_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports").join("canoas.json");

    write_report(&report(), &path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["city"], "Canoas (RS)");
    assert_eq!(json["kpis"]["net"], 3);
    assert_eq!(json["diagnostics"][0]["stage"], "fetch");
    assert_eq!(json["dataset_rows"], 12);

    let back: CityReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report());
}
