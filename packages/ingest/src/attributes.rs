//! Reads the per-subdivision attribute table from CSV.
//!
//! Empty cells and the usual null markers become missing values. Values
//! outside their domain (a decile outside 1-10, a negative population) are
//! also treated as missing, with a warning, rather than failing the load.

use std::io::Read;

use deprivation_overlay_models::{AttributeTable, SubdivisionAttributes};

use crate::IngestError;
use crate::config::AttributeColumns;

/// Cell values treated as missing, compared case-insensitively.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NULL", "NAN", "-"];

/// Column positions resolved from the header row.
struct ColumnIndices {
    key: usize,
    score: usize,
    decile: usize,
    population: usize,
}

/// Reads a CSV attribute table keyed by subdivision key.
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV is malformed, a configured column is
/// absent from the header, the delimiter is not a single byte, or a key
/// occurs twice.
pub fn read_attributes<R: Read>(
    reader: R,
    columns: &AttributeColumns,
) -> Result<AttributeTable, IngestError> {
    let delimiter = u8::try_from(columns.delimiter).map_err(|_| IngestError::Conversion {
        message: format!("CSV delimiter {:?} is not a single byte", columns.delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IngestError::Conversion {
                message: format!("attribute CSV has no column named {name:?}"),
            })
    };

    let indices = ColumnIndices {
        key: find(&columns.key_column)?,
        score: find(&columns.score_column)?,
        decile: find(&columns.decile_column)?,
        population: find(&columns.population_column)?,
    };

    let mut table = AttributeTable::new();

    for result in reader.records() {
        let record = result?;
        let cell = |i: usize| record.get(i).map(str::trim).filter(|v| !is_missing(v));

        let Some(key) = cell(indices.key) else {
            log::warn!("Skipping attribute row without a key: {record:?}");
            continue;
        };

        let attributes = SubdivisionAttributes {
            deprivation_score: cell(indices.score).and_then(|v| parse_score(key, v)),
            deprivation_decile: cell(indices.decile).and_then(|v| parse_decile(key, v)),
            urban_rural_population: cell(indices.population)
                .and_then(|v| parse_population(key, v)),
        };

        if table.insert(key.to_string(), attributes).is_some() {
            return Err(IngestError::DuplicateKey {
                collection: "attributes".to_string(),
                key: key.to_string(),
            });
        }
    }

    log::info!("Read attributes for {} subdivisions", table.len());

    Ok(table)
}

fn is_missing(value: &str) -> bool {
    MISSING_MARKERS
        .iter()
        .any(|marker| value.eq_ignore_ascii_case(marker))
}

fn parse_score(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(score) if score.is_finite() => Some(score),
        _ => {
            log::warn!("Subdivision {key}: ignoring unparseable score {value:?}");
            None
        }
    }
}

fn parse_decile(key: &str, value: &str) -> Option<u8> {
    match parse_whole_number(value) {
        Some(decile) if (1..=10).contains(&decile) => u8::try_from(decile).ok(),
        _ => {
            log::warn!("Subdivision {key}: ignoring decile {value:?} outside 1-10");
            None
        }
    }
}

fn parse_population(key: &str, value: &str) -> Option<u64> {
    let population = parse_whole_number(value);
    if population.is_none() {
        log::warn!("Subdivision {key}: ignoring invalid population {value:?}");
    }
    population
}

/// Parses a non-negative whole number, accepting a float spelling such as
/// `"9.0"`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn parse_whole_number(value: &str) -> Option<u64> {
    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }
    let float = value.parse::<f64>().ok()?;
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64)
        .then_some(float as u64)
}
