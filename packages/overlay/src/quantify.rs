//! Overlap quantification for candidate pairs.
//!
//! Intersects each candidate pair exactly, sums the area of every part of
//! the result (slivers included), and divides by the subdivision's declared
//! nominal area to get the overlap weight.

use deprivation_overlay_models::{OverlayOptions, OverlayWarning};
use deprivation_spatial::{CandidatePair, GeometryStore, area, area_tolerance, intersection};
use rayon::prelude::*;

use crate::progress::ProgressCallback;

/// A candidate pair with a defined, nonzero overlap weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPair {
    pub locality_index: usize,
    pub subdivision_index: usize,
    pub intersection_area: f64,
    pub subdivision_geometry_area: f64,
    pub overlap_weight: f64,
    /// Area error the intersection kernel may have introduced.
    pub area_tolerance: f64,
}

/// What happened to a single candidate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Weighted(WeightedPair),
    /// The geometries only touch (or overlap by no more than
    /// `min_intersection_area`); the pair carries no area.
    Touching,
    /// The subdivision's nominal area cannot serve as a denominator.
    UndefinedWeight(OverlayWarning),
}

/// Result of quantifying a batch of candidate pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantification {
    pub pairs: Vec<WeightedPair>,
    pub touching_pairs: usize,
    pub warnings: Vec<OverlayWarning>,
}

/// Quantifies every candidate pair in parallel, advancing `progress` by one
/// per pair. Output keeps the order of `candidates`.
#[must_use]
pub fn quantify(
    store: &GeometryStore,
    candidates: &[CandidatePair],
    options: &OverlayOptions,
    progress: &dyn ProgressCallback,
) -> Quantification {
    let outcomes: Vec<PairOutcome> = candidates
        .par_iter()
        .map(|candidate| {
            let outcome = quantify_pair(store, *candidate, options);
            progress.advance(1);
            outcome
        })
        .collect();

    let mut quantification = Quantification::default();
    for outcome in outcomes {
        match outcome {
            PairOutcome::Weighted(pair) => quantification.pairs.push(pair),
            PairOutcome::Touching => quantification.touching_pairs += 1,
            PairOutcome::UndefinedWeight(warning) => quantification.warnings.push(warning),
        }
    }

    log::info!(
        "Quantified {} candidate pairs: {} weighted, {} touching, {} undefined weight",
        candidates.len(),
        quantification.pairs.len(),
        quantification.touching_pairs,
        quantification.warnings.len()
    );

    quantification
}

/// Quantifies a single candidate pair.
///
/// Touching is decided before the denominator, so a pair that carries no
/// area is never reported as an undefined weight.
///
/// # Panics
///
/// Panics if either ordinal in `candidate` is not in `store`.
#[must_use]
pub fn quantify_pair(
    store: &GeometryStore,
    candidate: CandidatePair,
    options: &OverlayOptions,
) -> PairOutcome {
    let locality = &store.localities()[candidate.locality_index];
    let subdivision = &store.subdivisions()[candidate.subdivision_index];

    let overlap = intersection(&locality.locality.geometry, &subdivision.subdivision.geometry);
    let intersection_area = area(&overlap);

    if intersection_area <= options.min_intersection_area {
        return PairOutcome::Touching;
    }

    let Some(denominator) = weight_denominator(subdivision.subdivision.area, options) else {
        log::warn!(
            "Undefined overlap weight for {}/{}: nominal area {:?}",
            locality.locality.id,
            subdivision.subdivision.key,
            subdivision.subdivision.area
        );
        return PairOutcome::UndefinedWeight(OverlayWarning::UndefinedWeight {
            locality_id: locality.locality.id.clone(),
            subdivision_key: subdivision.subdivision.key.clone(),
            area: subdivision.subdivision.area,
        });
    };

    let tolerance = area_tolerance(&overlap, &locality.envelope, &subdivision.envelope);
    if intersection_area > subdivision.geometry_area + tolerance {
        log::debug!(
            "Intersection of {}/{} ({intersection_area}) exceeds subdivision polygon area ({})",
            locality.locality.id,
            subdivision.subdivision.key,
            subdivision.geometry_area
        );
    }

    PairOutcome::Weighted(WeightedPair {
        locality_index: candidate.locality_index,
        subdivision_index: candidate.subdivision_index,
        intersection_area,
        subdivision_geometry_area: subdivision.geometry_area,
        overlap_weight: intersection_area / denominator,
        area_tolerance: tolerance,
    })
}

/// Nominal area in geometry units, or `None` when it cannot divide.
fn weight_denominator(nominal_area: Option<f64>, options: &OverlayOptions) -> Option<f64> {
    let denominator = nominal_area? * options.area_unit_scale;
    (denominator.is_finite() && denominator > 0.0).then_some(denominator)
}
