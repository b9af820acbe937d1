#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Locality, subdivision and summary types for the deprivation overlay.
//!
//! Localities are the user-facing areas we report on. Subdivisions are the
//! finer statistical areas that carry the deprivation attributes. The two
//! boundary sets are drawn independently, so every locality figure is an
//! overlap-weighted combination of the subdivisions it touches.

pub mod report;

use std::collections::{BTreeMap, BTreeSet};

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

pub use report::{GeometryCollection, OverlayReport, OverlayWarning};

/// A named locality boundary, as supplied by the ingest layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Locality {
    /// Unique locality identifier.
    pub id: String,
    /// Human-readable name. Unnamed localities are normally dropped upstream.
    pub name: Option<String>,
    /// Boundary in the shared projected coordinate system.
    pub geometry: MultiPolygon<f64>,
    /// Every other source attribute, carried through to the output untouched.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Locality {
    /// Creates a locality with no extra attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            name,
            geometry,
            attributes: serde_json::Map::new(),
        }
    }
}

/// A statistical subdivision boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Subdivision {
    /// Unique subdivision key. Separate namespace from locality ids.
    pub key: String,
    /// Boundary in the shared projected coordinate system.
    pub geometry: MultiPolygon<f64>,
    /// Declared nominal area used as the overlap weight denominator.
    ///
    /// Independent of the digitized polygon's area; `None` when the source
    /// row has no usable value.
    pub area: Option<f64>,
}

impl Subdivision {
    #[must_use]
    pub fn new(key: impl Into<String>, geometry: MultiPolygon<f64>, area: Option<f64>) -> Self {
        Self {
            key: key.into(),
            geometry,
            area,
        }
    }
}

/// Socioeconomic attributes for one subdivision. Every field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdivisionAttributes {
    /// Continuous deprivation score.
    pub deprivation_score: Option<f64>,
    /// Deprivation decile, 1 (least deprived) to 10 (most deprived).
    pub deprivation_decile: Option<u8>,
    /// Urban/rural usual-resident population count.
    pub urban_rural_population: Option<u64>,
}

/// Subdivision attributes keyed by subdivision key.
pub type AttributeTable = BTreeMap<String, SubdivisionAttributes>;

/// One intersecting (locality, subdivision) combination with its weight and
/// the subdivision's joined attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapPair {
    pub locality_id: String,
    pub subdivision_key: String,
    /// Ordinal of the subdivision inside the geometry store. Stable for a run.
    pub subdivision_index: usize,
    /// Summed area of every part of the intersection geometry.
    pub intersection_area: f64,
    /// Area of the subdivision polygon itself, for sanity checks.
    pub subdivision_geometry_area: f64,
    /// `intersection_area / nominal area`. Not clamped to 1.
    pub overlap_weight: f64,
    pub attributes: SubdivisionAttributes,
}

/// Overlap-weighted summary for one locality.
///
/// Each field is `None` when its weighted denominator is zero or all of its
/// inputs are missing. `None` means "no data", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalitySummary {
    pub deprivation_score_mean: Option<f64>,
    pub deprivation_decile_mean: Option<f64>,
    pub population_weighted: Option<f64>,
    pub population_weighted_high_deprivation: Option<f64>,
    /// Percentage in `[0, 100]` when defined.
    pub population_pct_high_deprivation: Option<f64>,
    /// Number of defined, nonzero-weight pairs that fed the reduction.
    pub pair_count: usize,
}

/// A locality with its summary attached, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalityResult {
    pub locality: Locality,
    /// `None` when the locality had no contributing pairs.
    pub summary: Option<LocalitySummary>,
}

impl LocalityResult {
    /// Flattens this result into an output row.
    #[must_use]
    pub fn output_row(&self) -> LocalityOutput {
        let summary = self.summary.unwrap_or_default();
        LocalityOutput {
            locality_id: self.locality.id.clone(),
            deprivation_score_mean: summary.deprivation_score_mean,
            deprivation_decile_mean: summary.deprivation_decile_mean,
            population_weighted: summary.population_weighted,
            population_weighted_high_deprivation: summary.population_weighted_high_deprivation,
            population_pct_high_deprivation: summary.population_pct_high_deprivation,
            pair_count: summary.pair_count,
        }
    }
}

/// Flat output row: a locality id plus its summary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityOutput {
    pub locality_id: String,
    pub deprivation_score_mean: Option<f64>,
    pub deprivation_decile_mean: Option<f64>,
    pub population_weighted: Option<f64>,
    pub population_weighted_high_deprivation: Option<f64>,
    pub population_pct_high_deprivation: Option<f64>,
    pub pair_count: usize,
}

/// Tunable parameters of an overlay run, deserialized from the `[overlay]`
/// table of a dataset config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Geometry-area units per nominal-area unit (e.g. `1e6` for square
    /// metre geometries against a square kilometre area column).
    pub area_unit_scale: f64,
    /// Pairs whose intersection area is at or below this value only touch
    /// and are dropped before aggregation.
    pub min_intersection_area: f64,
    /// Deciles counted as high deprivation.
    pub high_deprivation_deciles: BTreeSet<u8>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            area_unit_scale: 1.0,
            min_intersection_area: 0.0,
            high_deprivation_deciles: BTreeSet::from([9, 10]),
        }
    }
}

impl OverlayOptions {
    /// Returns whether `decile` counts as high deprivation.
    #[must_use]
    pub fn is_high_deprivation(&self, decile: u8) -> bool {
        self.high_deprivation_deciles.contains(&decile)
    }
}
