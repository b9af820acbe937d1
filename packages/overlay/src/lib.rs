#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area-weighted deprivation overlay.
//!
//! Estimates locality-level deprivation indicators from statistical
//! subdivisions whose boundaries do not nest inside the localities. The
//! pipeline runs strictly forward:
//!
//! 1. [`GeometryStore::load`] validates both boundary collections.
//! 2. [`GeometryStore::candidate_pairs`] finds intersecting pairs.
//! 3. [`quantify::quantify`] computes overlap areas and weights.
//! 4. [`join::join_attributes`] attaches subdivision attributes.
//! 5. [`aggregate::aggregate`] reduces pairs into locality summaries.
//! 6. [`assemble::assemble`] puts the summaries back on the localities.
//!
//! [`run_overlay`] wires the stages together and collects every non-fatal
//! exclusion into an [`OverlayReport`].

pub mod aggregate;
pub mod assemble;
pub mod join;
pub mod progress;
pub mod quantify;

use deprivation_overlay_models::{
    AttributeTable, Locality, LocalityResult, OverlapPair, OverlayOptions, OverlayReport,
    Subdivision,
};
use deprivation_spatial::{GeometryStore, SpatialError};
use thiserror::Error;

use crate::progress::{OverlayStage, ProgressCallback};

/// Errors that abort an overlay run.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The input collections violate a structural precondition.
    #[error("Spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// The run options cannot produce meaningful weights.
    #[error("Invalid overlay options: {message}")]
    InvalidOptions {
        /// Description of what went wrong.
        message: String,
    },
}

/// Everything an overlay run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRun {
    /// One row per accepted locality, in input order.
    pub results: Vec<LocalityResult>,
    /// Every pair that fed the aggregation.
    pub pairs: Vec<OverlapPair>,
    pub report: OverlayReport,
}

/// Runs the full overlay over one set of inputs.
///
/// # Errors
///
/// * [`OverlayError::Spatial`] if a collection is empty, has duplicate keys,
///   or has no valid geometry.
/// * [`OverlayError::InvalidOptions`] if `options` cannot produce weights.
pub fn run_overlay(
    localities: Vec<Locality>,
    subdivisions: Vec<Subdivision>,
    attributes: &AttributeTable,
    options: &OverlayOptions,
    progress: &dyn ProgressCallback,
) -> Result<OverlayRun, OverlayError> {
    validate_options(options)?;

    let store = GeometryStore::load(localities, subdivisions)?;

    let mut report = OverlayReport {
        locality_count: store.localities().len(),
        subdivision_count: store.subdivisions().len(),
        warnings: store.rejected().to_vec(),
        ..OverlayReport::default()
    };

    progress.start_stage(OverlayStage::Indexing, None);
    let candidates = store.candidate_pairs();
    report.candidate_pairs = candidates.len();

    progress.start_stage(OverlayStage::Quantifying, Some(candidates.len() as u64));
    let quantified = quantify::quantify(&store, &candidates, options, progress);
    report.touching_pairs = quantified.touching_pairs;
    report.undefined_weight_pairs = quantified.warnings.len();
    report.warnings.extend(quantified.warnings);

    progress.start_stage(
        OverlayStage::Aggregating,
        Some(quantified.pairs.len() as u64),
    );
    let joined = join::join_attributes(&store, &quantified.pairs, attributes);
    report.contributing_pairs = joined.pairs.len();
    report.warnings.extend(joined.warnings);

    let summaries = aggregate::aggregate(&joined.pairs, options);

    let (results, undefined) = assemble::assemble(store.into_localities(), &summaries);
    report.warnings.extend(undefined);

    progress.finish(format!(
        "Summarized {} of {} localities",
        summaries.len(),
        results.len()
    ));

    Ok(OverlayRun {
        results,
        pairs: joined.pairs,
        report,
    })
}

fn validate_options(options: &OverlayOptions) -> Result<(), OverlayError> {
    if !(options.area_unit_scale.is_finite() && options.area_unit_scale > 0.0) {
        return Err(OverlayError::InvalidOptions {
            message: format!(
                "area_unit_scale must be positive and finite, got {}",
                options.area_unit_scale
            ),
        });
    }
    if !(options.min_intersection_area.is_finite() && options.min_intersection_area >= 0.0) {
        return Err(OverlayError::InvalidOptions {
            message: format!(
                "min_intersection_area must be non-negative, got {}",
                options.min_intersection_area
            ),
        });
    }
    if let Some(decile) = options
        .high_deprivation_deciles
        .iter()
        .find(|d| !(1..=10).contains(*d))
    {
        return Err(OverlayError::InvalidOptions {
            message: format!("high deprivation decile {decile} is outside 1-10"),
        });
    }
    Ok(())
}
