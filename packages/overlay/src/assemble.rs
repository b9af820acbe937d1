//! Left-outer join of locality summaries back onto the localities.

use std::collections::BTreeMap;

use deprivation_overlay_models::{Locality, LocalityResult, LocalitySummary, OverlayWarning};

/// Attaches each locality's summary, keeping every locality in input order.
///
/// Localities without a summary, or whose summary has every field
/// undefined, are reported as [`OverlayWarning::UndefinedAggregate`].
#[must_use]
pub fn assemble(
    localities: Vec<Locality>,
    summaries: &BTreeMap<String, LocalitySummary>,
) -> (Vec<LocalityResult>, Vec<OverlayWarning>) {
    let mut warnings = Vec::new();

    let results: Vec<LocalityResult> = localities
        .into_iter()
        .map(|locality| {
            let summary = summaries.get(&locality.id).copied();

            let reason = match &summary {
                None => Some("no subdivisions with a defined overlap weight"),
                Some(s) if is_undefined(s) => Some("all joined attributes missing"),
                Some(_) => None,
            };

            if let Some(reason) = reason {
                log::warn!("Locality {} has no summary: {reason}", locality.id);
                warnings.push(OverlayWarning::UndefinedAggregate {
                    locality_id: locality.id.clone(),
                    reason: reason.to_string(),
                });
            }

            LocalityResult { locality, summary }
        })
        .collect();

    (results, warnings)
}

const fn is_undefined(summary: &LocalitySummary) -> bool {
    summary.deprivation_score_mean.is_none()
        && summary.deprivation_decile_mean.is_none()
        && summary.population_weighted.is_none()
        && summary.population_weighted_high_deprivation.is_none()
        && summary.population_pct_high_deprivation.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rect;

    #[test]
    fn keeps_localities_without_summary() {
        let localities = vec![
            Locality::new("L1", Some("North".to_string()), rect(0.0, 0.0, 1.0, 1.0)),
            Locality::new("L2", Some("South".to_string()), rect(0.0, -1.0, 1.0, 0.0)),
        ];
        let mut summaries = BTreeMap::new();
        summaries.insert(
            "L1".to_string(),
            LocalitySummary {
                deprivation_score_mean: Some(12.0),
                pair_count: 1,
                ..LocalitySummary::default()
            },
        );

        let (results, warnings) = assemble(localities.clone(), &summaries);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].locality, localities[0]);
        assert_eq!(
            results[0].summary.and_then(|s| s.deprivation_score_mean),
            Some(12.0)
        );
        assert_eq!(results[1].locality, localities[1]);
        assert_eq!(results[1].summary, None);
        assert!(matches!(
            warnings.as_slice(),
            [OverlayWarning::UndefinedAggregate { locality_id, .. }] if locality_id == "L2"
        ));
    }

    #[test]
    fn reports_summary_with_every_field_undefined() {
        let localities = vec![Locality::new(
            "L1",
            Some("Empty".to_string()),
            rect(0.0, 0.0, 1.0, 1.0),
        )];
        let summaries = BTreeMap::from([(
            "L1".to_string(),
            LocalitySummary {
                pair_count: 2,
                ..LocalitySummary::default()
            },
        )]);

        let (results, warnings) = assemble(localities, &summaries);

        assert_eq!(results[0].summary.map(|s| s.pair_count), Some(2));
        assert_eq!(warnings.len(), 1);
    }
}
