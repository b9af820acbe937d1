#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output side of the deprivation overlay.
//!
//! Writes assembled locality results as a `GeoJSON` `FeatureCollection`
//! (original properties plus the summary fields, geometry unchanged), as a
//! flat summary CSV, and writes the coverage report as JSON. Undefined
//! summary values are written as JSON `null` and empty CSV cells, never as
//! zero.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use deprivation_overlay_models::{LocalityResult, LocalitySummary};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use serde::Serialize;
use thiserror::Error;

/// Property names of the summary fields added to each output feature.
pub const SUMMARY_FIELDS: [&str; 5] = [
    "deprivation_score_mean",
    "deprivation_decile_mean",
    "population_weighted",
    "population_weighted_high_deprivation",
    "population_pct_high_deprivation",
];

/// Errors that can occur while writing outputs.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Writing failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builds the output feature for one locality.
#[must_use]
pub fn locality_feature(result: &LocalityResult) -> Feature {
    let mut properties: JsonObject = result.locality.attributes.clone();
    let summary = result.summary.unwrap_or_default();

    for (field, value) in SUMMARY_FIELDS.iter().zip(summary_values(&summary)) {
        properties.insert((*field).to_string(), serde_json::json!(value));
    }

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &result.locality.geometry,
        ))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

const fn summary_values(summary: &LocalitySummary) -> [Option<f64>; 5] {
    [
        summary.deprivation_score_mean,
        summary.deprivation_decile_mean,
        summary.population_weighted,
        summary.population_weighted_high_deprivation,
        summary.population_pct_high_deprivation,
    ]
}

/// Writes every result as one `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns [`GenerateError`] if serialization or writing fails.
pub fn write_geojson<W: Write>(results: &[LocalityResult], writer: W) -> Result<(), GenerateError> {
    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: results.iter().map(locality_feature).collect(),
        foreign_members: None,
    });

    let mut writer = BufWriter::new(writer);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    log::info!("Wrote {} locality features", results.len());
    Ok(())
}

/// Writes one summary row per result, with empty cells for undefined
/// values.
///
/// # Errors
///
/// Returns [`GenerateError`] if serialization or writing fails.
pub fn write_summary_csv<W: Write>(
    results: &[LocalityResult],
    writer: W,
) -> Result<(), GenerateError> {
    let mut writer = csv::Writer::from_writer(writer);
    for result in results {
        writer.serialize(result.output_row())?;
    }
    writer.flush()?;

    log::info!("Wrote {} summary rows", results.len());
    Ok(())
}

/// Writes a report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`GenerateError`] if serialization or writing fails.
pub fn write_report<T: Serialize, W: Write>(report: &T, writer: W) -> Result<(), GenerateError> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Creates `path` and hands a writer for it to `write`.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be created or `write`
/// fails.
pub fn write_file<F>(path: &Path, write: F) -> Result<(), GenerateError>
where
    F: FnOnce(File) -> Result<(), GenerateError>,
{
    let file = File::create(path)?;
    write(file)?;
    log::info!("Generated {}", path.display());
    Ok(())
}
