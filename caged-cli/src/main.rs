//! CAGED CLI: fetch releases, summarize a window, inspect the cache.
//!
//! Commands:
//! - `fetch`: download and extract one monthly release into the cache
//! - `window`: build a multi-month window and print the city dashboard
//! - `cache status`: list cached archives and extracted files per month

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use caged_core::data::ArchiveCache;
use caged_core::domain::ReferenceMonth;
use caged_runner::{
    build_window, export_parquet, format_brl, pick_city, write_report, ArchivePipeline,
    CityReport, Diagnostic, PipelineConfig, StderrProgress,
};

#[derive(Parser)]
#[command(
    name = "caged",
    about = "CAGED CLI: Brazilian formal employment microdata pipeline"
)]
struct Cli {
    /// Path to a TOML pipeline config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory; overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and extract one monthly release.
    Fetch {
        /// Release year. Defaults to the current year.
        #[arg(long)]
        year: Option<i32>,

        /// Release month (1-12).
        #[arg(long)]
        month: u32,
    },
    /// Build a window of months and summarize one city.
    Window {
        /// Last year of the window. Defaults to the current year.
        #[arg(long)]
        end_year: Option<i32>,

        /// Last month of the window (1-12).
        #[arg(long)]
        end_month: u32,

        /// Number of months, walking backward from the end month.
        #[arg(long)]
        window_size: Option<usize>,

        /// Municipality label, e.g. "Porto Alegre (RS)". Defaults to Canoas (RS) when present.
        #[arg(long)]
        city: Option<String>,

        /// Restrict to one sector label, e.g. "Comércio".
        #[arg(long)]
        sector: Option<String>,

        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the window's canonical rows to this Parquet file.
        #[arg(long)]
        export_parquet: Option<PathBuf>,

        /// Also write the JSON report to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached months with archive and flat-file sizes.
    Status,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.cache_dir)?;

    match cli.command {
        Commands::Fetch { year, month } => run_fetch(&config, year, month),
        Commands::Window {
            end_year,
            end_month,
            window_size,
            city,
            sector,
            json,
            export_parquet,
            report,
        } => run_window(
            &config,
            WindowArgs {
                end_year,
                end_month,
                window_size,
                city,
                sector,
                json,
                export_parquet,
                report,
            },
        ),
        Commands::Cache { action } => match action {
            CacheAction::Status => run_cache_status(&config.cache_dir),
        },
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>, cache_dir: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cache_dir {
        config.cache_dir = dir;
    }
    info!(
        base_url = %config.base_url,
        cache_dir = %config.cache_dir.display(),
        "configuration loaded"
    );
    Ok(config)
}

fn reference_month(year: Option<i32>, month: u32) -> Result<ReferenceMonth> {
    let year = year.unwrap_or_else(|| chrono::Local::now().year());
    ReferenceMonth::new(year, month).context("invalid reference month")
}

fn run_fetch(config: &PipelineConfig, year: Option<i32>, month: u32) -> Result<()> {
    let month = reference_month(year, month)?;
    let pipeline = ArchivePipeline::from_config(config)?;

    let archive = pipeline.fetcher().archive(month)?;
    let flat = pipeline.prepare(month)?;
    if flat != archive.flat_file_path {
        info!(
            expected = %archive.flat_file_path.display(),
            "archive used a non-standard flat file name"
        );
    }

    println!("Month:     {}", archive.month);
    println!("Source:    {}", archive.remote_url);
    println!("Archive:   {}", archive.archive_path.display());
    println!("Flat file: {}", flat.display());
    Ok(())
}

struct WindowArgs {
    end_year: Option<i32>,
    end_month: u32,
    window_size: Option<usize>,
    city: Option<String>,
    sector: Option<String>,
    json: bool,
    export_parquet: Option<PathBuf>,
    report: Option<PathBuf>,
}

fn run_window(config: &PipelineConfig, args: WindowArgs) -> Result<()> {
    let end = reference_month(args.end_year, args.end_month)?;
    let window_size = args.window_size.unwrap_or(config.window_size);
    let pipeline = ArchivePipeline::from_config(config)?;

    let result = build_window(&pipeline, end, window_size, &StderrProgress);
    for diagnostic in &result.diagnostics {
        eprintln!("WARNING: {diagnostic}");
    }
    let Some(dataset) = result.dataset else {
        bail!("no month in the {window_size}-month window ending {end} produced data");
    };

    if let Some(path) = &args.export_parquet {
        let rows = export_parquet(&dataset, path)?;
        info!(rows, path = %path.display(), "window exported");
    }

    let dataset = match args.sector.as_deref() {
        Some(sector) => {
            let slice = dataset.slice(None, Some(sector));
            if slice.is_empty() {
                bail!("sector '{sector}' has no rows in the loaded window");
            }
            slice
        }
        None => dataset,
    };

    let city = pick_city(&dataset, args.city.as_deref())?;
    let report = CityReport::build(&dataset, &city, end, &result.diagnostics)?;

    if let Some(path) = &args.report {
        write_report(&report, path)?;
        info!(path = %path.display(), "report written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.sector.as_deref());
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let statuses = ArchiveCache::new(cache_dir).status()?;
    if statuses.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total: u64 = statuses
        .iter()
        .map(|s| s.archive_bytes.unwrap_or(0) + s.flat_file_bytes.unwrap_or(0))
        .sum();

    println!("Cache: {}", cache_dir.display());
    println!("Months: {}", statuses.len());
    println!("Total size: {}", format_size(total));
    println!();
    println!("{:<8} {:>12} {:>12}", "Month", "Archive", "Flat file");
    println!("{}", "-".repeat(34));
    for s in &statuses {
        println!(
            "{:<8} {:>12} {:>12}",
            s.month.to_string(),
            s.archive_bytes.map_or("-".to_string(), format_size),
            s.flat_file_bytes.map_or("-".to_string(), format_size),
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_report(report: &CityReport, sector: Option<&str>) {
    let kpis = &report.kpis;
    println!();
    println!("=== {}: {} ===", report.city, report.month);
    if let Some(sector) = sector {
        println!("Sector:         {sector}");
    }
    println!("Movements:      {}", kpis.total);
    println!("Admissions:     {}", kpis.admissions);
    println!("Terminations:   {}", kpis.terminations);
    println!(
        "Net balance:    {} ({})",
        kpis.net,
        if kpis.net > 0 { "positive" } else { "negative" }
    );
    println!(
        "Top hiring:     {}",
        kpis.top_sector.as_deref().unwrap_or("-")
    );
    match &kpis.best_paying {
        Some(best) => println!("Best paying:    {} (R$ {})", best.label, format_brl(best.value)),
        None => println!("Best paying:    -"),
    }

    if !report.sector_volume.is_empty() {
        println!();
        println!("--- Admissions by sector ---");
        for s in &report.sector_volume {
            println!("{:<24} {:>8}", s.label, s.count);
        }
    }

    if !report.gender_profile.is_empty() {
        println!();
        println!("--- Admissions by gender ---");
        for g in &report.gender_profile {
            println!("{:<24} {:>8}", g.label, g.count);
        }
    }

    println!();
    println!("--- Net balance by month ---");
    for p in &report.balance_trend {
        println!("{:<24} {:>8}", p.month, p.net);
    }

    if !report.wage_ranking.is_empty() {
        println!();
        println!("--- Mean admission wage by sector ---");
        for w in &report.wage_ranking {
            println!("{:<24} {:>14}", w.label, format!("R$ {}", format_brl(w.value)));
        }
    }

    print_diagnostics(&report.diagnostics);
    println!();
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("--- Months skipped ---");
    for d in diagnostics {
        println!("{d}");
    }
}
