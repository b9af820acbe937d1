#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory geometry store for locality/subdivision overlays.
//!
//! Validates both boundary collections once, caches each entity's bounding
//! box and polygon area, and bulk-loads the subdivisions into an R-tree so
//! candidate discovery never falls back to an all-pairs exact test. The
//! store owns both collections for the lifetime of a run and is only ever
//! shared immutably.

pub mod candidates;

use std::collections::{BTreeMap, BTreeSet};

use deprivation_overlay_models::{GeometryCollection, Locality, OverlayWarning, Subdivision};
use geo::{
    Area, BooleanOps, BoundingRect, CoordsIter, Intersects, LineString, MultiPolygon, Validation,
};
use rstar::{AABB, Envelope, RTree, RTreeObject};
use thiserror::Error;

pub use candidates::CandidatePair;

/// Fatal structural problems with the input collections.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// One of the two collections was not supplied at all.
    #[error("No {collection} supplied")]
    MissingCollection {
        /// The empty collection.
        collection: GeometryCollection,
    },

    /// A primary key occurs more than once within a collection.
    #[error("Duplicate key {key:?} in {collection}")]
    DuplicateKey {
        /// The collection containing the duplicate.
        collection: GeometryCollection,
        /// The repeated key.
        key: String,
    },

    /// Every geometry in a collection was malformed.
    #[error("No valid geometries left in {collection}")]
    NoValidGeometries {
        /// The collection that ended up empty.
        collection: GeometryCollection,
    },
}

/// A validated locality with its cached geometry facts.
#[derive(Debug, Clone)]
pub struct LocalityEntry {
    pub locality: Locality,
    pub envelope: AABB<[f64; 2]>,
    pub geometry_area: f64,
}

/// A validated subdivision with its cached geometry facts.
#[derive(Debug, Clone)]
pub struct SubdivisionEntry {
    /// Ordinal assigned at load time, stable for the run.
    pub index: usize,
    pub subdivision: Subdivision,
    pub envelope: AABB<[f64; 2]>,
    pub geometry_area: f64,
}

/// Bounding box of a subdivision stored in the R-tree, by ordinal.
struct BoundaryEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Owner of both boundary collections for one overlay run.
pub struct GeometryStore {
    localities: Vec<LocalityEntry>,
    subdivisions: Vec<SubdivisionEntry>,
    subdivision_tree: RTree<BoundaryEntry>,
    subdivision_keys: BTreeMap<String, usize>,
    rejected: Vec<OverlayWarning>,
}

impl GeometryStore {
    /// Validates both collections and builds the subdivision R-tree.
    ///
    /// Malformed geometries are excluded and recorded as
    /// [`OverlayWarning::InvalidGeometry`]; see [`Self::rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if either collection is empty, contains a
    /// duplicate key, or has no valid geometry left after exclusion.
    pub fn load(
        localities: Vec<Locality>,
        subdivisions: Vec<Subdivision>,
    ) -> Result<Self, SpatialError> {
        if localities.is_empty() {
            return Err(SpatialError::MissingCollection {
                collection: GeometryCollection::Localities,
            });
        }
        if subdivisions.is_empty() {
            return Err(SpatialError::MissingCollection {
                collection: GeometryCollection::Subdivisions,
            });
        }

        ensure_unique(
            localities.iter().map(|l| l.id.as_str()),
            GeometryCollection::Localities,
        )?;
        ensure_unique(
            subdivisions.iter().map(|s| s.key.as_str()),
            GeometryCollection::Subdivisions,
        )?;

        let mut rejected = Vec::new();

        let localities: Vec<LocalityEntry> = localities
            .into_iter()
            .filter_map(|locality| {
                match accept(&locality.geometry, GeometryCollection::Localities, &locality.id) {
                    Ok((envelope, geometry_area)) => Some(LocalityEntry {
                        locality,
                        envelope,
                        geometry_area,
                    }),
                    Err(warning) => {
                        rejected.push(warning);
                        None
                    }
                }
            })
            .collect();

        let subdivisions: Vec<SubdivisionEntry> = subdivisions
            .into_iter()
            .filter_map(|subdivision| {
                match accept(
                    &subdivision.geometry,
                    GeometryCollection::Subdivisions,
                    &subdivision.key,
                ) {
                    Ok((envelope, geometry_area)) => Some((subdivision, envelope, geometry_area)),
                    Err(warning) => {
                        rejected.push(warning);
                        None
                    }
                }
            })
            .enumerate()
            .map(|(index, (subdivision, envelope, geometry_area))| SubdivisionEntry {
                index,
                subdivision,
                envelope,
                geometry_area,
            })
            .collect();

        if localities.is_empty() {
            return Err(SpatialError::NoValidGeometries {
                collection: GeometryCollection::Localities,
            });
        }
        if subdivisions.is_empty() {
            return Err(SpatialError::NoValidGeometries {
                collection: GeometryCollection::Subdivisions,
            });
        }

        let subdivision_keys = subdivisions
            .iter()
            .map(|entry| (entry.subdivision.key.clone(), entry.index))
            .collect();

        let subdivision_tree = RTree::bulk_load(
            subdivisions
                .iter()
                .map(|entry| BoundaryEntry {
                    index: entry.index,
                    envelope: entry.envelope,
                })
                .collect(),
        );

        log::info!(
            "Loaded {} localities and {} subdivisions into geometry store ({} rejected)",
            localities.len(),
            subdivisions.len(),
            rejected.len()
        );

        Ok(Self {
            localities,
            subdivisions,
            subdivision_tree,
            subdivision_keys,
            rejected,
        })
    }

    /// Accepted localities in input order.
    #[must_use]
    pub fn localities(&self) -> &[LocalityEntry] {
        &self.localities
    }

    /// Accepted subdivisions, indexed by their ordinal.
    #[must_use]
    pub fn subdivisions(&self) -> &[SubdivisionEntry] {
        &self.subdivisions
    }

    #[must_use]
    pub fn locality(&self, index: usize) -> Option<&LocalityEntry> {
        self.localities.get(index)
    }

    /// Look up a subdivision ordinal by key.
    #[must_use]
    pub fn subdivision_index(&self, key: &str) -> Option<usize> {
        self.subdivision_keys.get(key).copied()
    }

    /// Geometries excluded at load time.
    #[must_use]
    pub fn rejected(&self) -> &[OverlayWarning] {
        &self.rejected
    }

    /// Releases the localities, consuming the store.
    #[must_use]
    pub fn into_localities(self) -> Vec<Locality> {
        self.localities
            .into_iter()
            .map(|entry| entry.locality)
            .collect()
    }
}

/// Planar area of a geometry, summed over every part.
#[must_use]
pub fn area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}

/// Exact intersects test (boundary contact counts).
#[must_use]
pub fn intersects(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    a.intersects(b)
}

/// Intersection of two geometries. Disjoint or merely touching inputs yield
/// an empty (zero-area) geometry rather than an error.
#[must_use]
pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    a.intersection(b)
}

/// Fraction of the inputs' combined extent that `BooleanOps` can move a
/// vertex when it snaps to its fixed-point grid (about 2^-32, with margin).
const KERNEL_RESOLUTION: f64 = 1.0 / 1_073_741_824.0;

/// Total boundary length of a geometry, interior rings included.
#[must_use]
pub fn perimeter(geometry: &MultiPolygon<f64>) -> f64 {
    geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .flat_map(LineString::lines)
        .map(|line| line.dx().hypot(line.dy()))
        .sum()
}

/// Largest area error [`intersection`] can introduce into `overlap`, given
/// the envelopes of the two inputs it was cut from.
///
/// Every vertex of the result may be displaced by up to one grid step, so
/// the error is bounded by the result's perimeter times that step.
#[must_use]
pub fn area_tolerance(
    overlap: &MultiPolygon<f64>,
    a: &AABB<[f64; 2]>,
    b: &AABB<[f64; 2]>,
) -> f64 {
    let combined = a.merged(b);
    let (lower, upper) = (combined.lower(), combined.upper());
    let extent = (upper[0] - lower[0]).max(upper[1] - lower[1]);
    2.0 * perimeter(overlap) * extent * KERNEL_RESOLUTION
}

fn ensure_unique<'a>(
    keys: impl Iterator<Item = &'a str>,
    collection: GeometryCollection,
) -> Result<(), SpatialError> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(SpatialError::DuplicateKey {
                collection,
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Validates a geometry and computes its envelope and area.
fn accept(
    geometry: &MultiPolygon<f64>,
    collection: GeometryCollection,
    key: &str,
) -> Result<(AABB<[f64; 2]>, f64), OverlayWarning> {
    let envelope = validate_geometry(geometry)
        .and_then(|()| compute_envelope(geometry).ok_or_else(|| "empty geometry".to_string()));

    match envelope {
        Ok(envelope) => Ok((envelope, area(geometry))),
        Err(reason) => {
            log::warn!("Excluding {collection} entry {key}: {reason}");
            Err(OverlayWarning::InvalidGeometry {
                collection,
                key: key.to_string(),
                reason,
            })
        }
    }
}

/// Checks a geometry is non-empty, finite and topologically valid.
fn validate_geometry(geometry: &MultiPolygon<f64>) -> Result<(), String> {
    if geometry.0.is_empty() {
        return Err("empty geometry".to_string());
    }
    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err("non-finite coordinate".to_string());
    }
    geometry.check_validation().map_err(|e| e.to_string())
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}
