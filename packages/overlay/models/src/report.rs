//! Non-fatal exclusions and the coverage report of an overlay run.
//!
//! Nothing in here aborts a run. Each exclusion is recorded as an
//! [`OverlayWarning`] so callers can audit which entities were dropped and
//! which localities ended up without data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which boundary collection an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryCollection {
    Localities,
    Subdivisions,
}

impl fmt::Display for GeometryCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Localities => f.write_str("localities"),
            Self::Subdivisions => f.write_str("subdivisions"),
        }
    }
}

/// A recovered, non-fatal problem encountered during an overlay run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayWarning {
    /// A malformed polygon; the entity was excluded from the run.
    InvalidGeometry {
        collection: GeometryCollection,
        key: String,
        reason: String,
    },
    /// A subdivision has geometry but no attribute row; its attributes are
    /// treated as missing.
    MissingJoinAttribute { subdivision_key: String },
    /// The subdivision's nominal area is missing, zero or negative; the
    /// pair was excluded from aggregation.
    UndefinedWeight {
        locality_id: String,
        subdivision_key: String,
        area: Option<f64>,
    },
    /// The locality has no summary (no eligible pairs).
    UndefinedAggregate { locality_id: String, reason: String },
}

impl fmt::Display for OverlayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry {
                collection,
                key,
                reason,
            } => write!(f, "invalid geometry in {collection} for {key}: {reason}"),
            Self::MissingJoinAttribute { subdivision_key } => {
                write!(f, "no attribute row for subdivision {subdivision_key}")
            }
            Self::UndefinedWeight {
                locality_id,
                subdivision_key,
                area,
            } => match area {
                Some(area) => write!(
                    f,
                    "undefined weight for {locality_id}/{subdivision_key}: area {area}"
                ),
                None => write!(
                    f,
                    "undefined weight for {locality_id}/{subdivision_key}: area missing"
                ),
            },
            Self::UndefinedAggregate {
                locality_id,
                reason,
            } => write!(f, "no summary for locality {locality_id}: {reason}"),
        }
    }
}

/// Counts and exclusions gathered over one overlay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayReport {
    /// Localities accepted into the geometry store.
    pub locality_count: usize,
    /// Subdivisions accepted into the geometry store.
    pub subdivision_count: usize,
    /// Pairs passing the bounding-box and exact intersects tests.
    pub candidate_pairs: usize,
    /// Pairs dropped because they only touch along a boundary, or overlap
    /// by no more than `min_intersection_area`.
    pub touching_pairs: usize,
    /// Pairs dropped because the subdivision weight is undefined.
    pub undefined_weight_pairs: usize,
    /// Pairs that fed the weighted aggregation.
    pub contributing_pairs: usize,
    pub warnings: Vec<OverlayWarning>,
}

impl OverlayReport {
    /// Keys of every entity excluded for invalid geometry.
    #[must_use]
    pub fn invalid_geometries(&self) -> Vec<(GeometryCollection, &str)> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                OverlayWarning::InvalidGeometry {
                    collection, key, ..
                } => Some((*collection, key.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Subdivision keys that had no attribute row.
    #[must_use]
    pub fn missing_attribute_keys(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                OverlayWarning::MissingJoinAttribute { subdivision_key } => {
                    Some(subdivision_key.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Localities whose summary is undefined.
    #[must_use]
    pub fn undefined_localities(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                OverlayWarning::UndefinedAggregate { locality_id, .. } => {
                    Some(locality_id.as_str())
                }
                _ => None,
            })
            .collect()
    }
}
