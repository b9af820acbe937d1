#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line runner for the area-weighted deprivation overlay.
//!
//! Reads locality and subdivision boundaries plus the subdivision attribute
//! table, runs the overlay, and writes the summarized localities as
//! `GeoJSON` (optionally also a summary CSV and a JSON coverage report).
//!
//! Uses `indicatif-log-bridge` (via [`deprivation_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use deprivation_cli_utils::OverlayProgress;
use deprivation_generate::{write_file, write_geojson, write_report, write_summary_csv};
use deprivation_ingest::{DatasetConfig, SkippedFeature};
use deprivation_overlay_models::OverlayReport;
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "deprivation_cli",
    about = "Area-weighted deprivation summaries for localities"
)]
struct Cli {
    /// Locality boundaries (`GeoJSON` `FeatureCollection`)
    #[arg(long)]
    localities: PathBuf,

    /// Subdivision boundaries with declared areas (`GeoJSON` `FeatureCollection`)
    #[arg(long)]
    subdivisions: PathBuf,

    /// Subdivision attribute table (CSV)
    #[arg(long)]
    attributes: PathBuf,

    /// Output `GeoJSON` with summary properties
    #[arg(long)]
    output: PathBuf,

    /// Also write one summary row per locality as CSV
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Also write the coverage report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Dataset configuration (TOML). Uses the built-in defaults if omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Coverage report written by `--report`: the overlay's own report plus
/// the features dropped while reading the boundary files.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    #[serde(flatten)]
    overlay: &'a OverlayReport,
    skipped_localities: &'a [SkippedFeature],
    skipped_subdivisions: &'a [SkippedFeature],
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = deprivation_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => deprivation_ingest::load_config(path)?,
        None => DatasetConfig::embedded_default(),
    };

    let localities = deprivation_ingest::read_localities(
        &std::fs::read_to_string(&cli.localities)?,
        &config.localities,
    )?;
    let subdivisions = deprivation_ingest::read_subdivisions(
        &std::fs::read_to_string(&cli.subdivisions)?,
        &config.subdivisions,
    )?;
    let attributes = deprivation_ingest::read_attributes(
        BufReader::new(File::open(&cli.attributes)?),
        &config.attributes,
    )?;

    let progress = OverlayProgress::new(&multi);
    let run = deprivation_overlay::run_overlay(
        localities.records,
        subdivisions.records,
        &attributes,
        &config.overlay,
        &progress,
    )?;

    write_file(&cli.output, |file| write_geojson(&run.results, file))?;

    if let Some(path) = &cli.summary_csv {
        write_file(path, |file| write_summary_csv(&run.results, file))?;
    }

    if let Some(path) = &cli.report {
        let report = RunReport {
            overlay: &run.report,
            skipped_localities: &localities.skipped,
            skipped_subdivisions: &subdivisions.skipped,
        };
        write_file(path, |file| write_report(&report, file))?;
    }

    log_coverage(&run.report, run.results.len());

    Ok(())
}

fn log_coverage(report: &OverlayReport, written: usize) {
    let undefined = report.undefined_localities();

    log::info!(
        "Wrote {written} localities ({} with a summary, {} undefined)",
        written.saturating_sub(undefined.len()),
        undefined.len()
    );
    log::info!(
        "{} candidate pairs: {} contributing, {} touching only, {} with undefined weight",
        report.candidate_pairs,
        report.contributing_pairs,
        report.touching_pairs,
        report.undefined_weight_pairs
    );

    let invalid = report.invalid_geometries();
    if !invalid.is_empty() {
        log::info!("{} geometries excluded as invalid", invalid.len());
    }

    let missing = report.missing_attribute_keys();
    if !missing.is_empty() {
        log::info!("{} subdivisions had no attribute row", missing.len());
    }
}
