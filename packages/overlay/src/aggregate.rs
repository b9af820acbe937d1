//! Weighted reduction of overlap pairs into one summary per locality.
//!
//! Pairs are grouped by locality id and each group is folded in
//! subdivision-ordinal order, so the result does not depend on the order
//! pairs arrive in. Groups are reduced in parallel.

use std::collections::BTreeMap;

use deprivation_overlay_models::{LocalitySummary, OverlapPair, OverlayOptions};
use rayon::prelude::*;

/// Weighted mean accumulator that skips missing values in both the
/// numerator and the denominator.
#[derive(Debug, Clone, Copy, Default)]
struct WeightedMean {
    weighted_sum: f64,
    weight_total: f64,
}

impl WeightedMean {
    fn add(&mut self, value: Option<f64>, weight: f64) {
        if let Some(value) = value {
            self.weighted_sum += value * weight;
            self.weight_total += weight;
        }
    }

    fn mean(self) -> Option<f64> {
        (self.weight_total > 0.0).then(|| self.weighted_sum / self.weight_total)
    }
}

/// Running totals for one locality.
#[derive(Debug, Clone, Copy, Default)]
struct SummaryAccumulator {
    score: WeightedMean,
    decile: WeightedMean,
    population: Option<f64>,
    population_high: f64,
    pair_count: usize,
}

impl SummaryAccumulator {
    fn add(&mut self, pair: &OverlapPair, options: &OverlayOptions) {
        let weight = pair.overlap_weight;
        let attributes = &pair.attributes;

        self.pair_count += 1;
        self.score.add(attributes.deprivation_score, weight);
        self.decile
            .add(attributes.deprivation_decile.map(f64::from), weight);

        if let Some(population) = attributes.urban_rural_population {
            #[allow(clippy::cast_precision_loss)]
            let weighted = population as f64 * weight;
            *self.population.get_or_insert(0.0) += weighted;

            if attributes
                .deprivation_decile
                .is_some_and(|decile| options.is_high_deprivation(decile))
            {
                self.population_high += weighted;
            }
        }
    }

    fn finish(self) -> LocalitySummary {
        let population_weighted_high_deprivation = self.population.map(|_| self.population_high);
        let population_pct_high_deprivation = self
            .population
            .filter(|total| *total > 0.0)
            .map(|total| self.population_high / total * 100.0);

        LocalitySummary {
            deprivation_score_mean: self.score.mean(),
            deprivation_decile_mean: self.decile.mean(),
            population_weighted: self.population,
            population_weighted_high_deprivation,
            population_pct_high_deprivation,
            pair_count: self.pair_count,
        }
    }
}

/// Whether a pair carries a usable, nonzero weight.
fn contributes(pair: &OverlapPair) -> bool {
    pair.overlap_weight.is_finite() && pair.overlap_weight > 0.0
}

/// Reduces one locality's pairs into a summary.
///
/// Returns `None` when no pair has a defined, nonzero weight.
#[must_use]
pub fn summarize(pairs: &[&OverlapPair], options: &OverlayOptions) -> Option<LocalitySummary> {
    let mut ordered: Vec<&OverlapPair> = pairs.iter().copied().filter(|p| contributes(p)).collect();
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by_key(|pair| pair.subdivision_index);

    let mut accumulator = SummaryAccumulator::default();
    for pair in ordered {
        accumulator.add(pair, options);
    }
    Some(accumulator.finish())
}

/// Groups pairs by locality id and summarizes each group.
///
/// Localities with no contributing pair are absent from the map.
#[must_use]
pub fn aggregate(
    pairs: &[OverlapPair],
    options: &OverlayOptions,
) -> BTreeMap<String, LocalitySummary> {
    let mut groups: BTreeMap<&str, Vec<&OverlapPair>> = BTreeMap::new();
    for pair in pairs {
        groups
            .entry(pair.locality_id.as_str())
            .or_default()
            .push(pair);
    }

    let summaries: BTreeMap<String, LocalitySummary> = groups
        .into_par_iter()
        .filter_map(|(locality_id, group)| {
            summarize(&group, options).map(|summary| (locality_id.to_string(), summary))
        })
        .collect();

    log::info!(
        "Aggregated {} pairs into {} locality summaries",
        pairs.len(),
        summaries.len()
    );

    summaries
}

#[cfg(test)]
mod tests {
    use deprivation_overlay_models::SubdivisionAttributes;

    use super::*;

    fn pair(
        locality_id: &str,
        subdivision_index: usize,
        weight: f64,
        score: Option<f64>,
        decile: Option<u8>,
        population: Option<u64>,
    ) -> OverlapPair {
        OverlapPair {
            locality_id: locality_id.to_string(),
            subdivision_key: format!("S{subdivision_index}"),
            subdivision_index,
            intersection_area: weight,
            subdivision_geometry_area: 1.0,
            overlap_weight: weight,
            attributes: SubdivisionAttributes {
                deprivation_score: score,
                deprivation_decile: decile,
                urban_rural_population: population,
            },
        }
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|a| (a - expected).abs() < 1e-9)
    }

    #[test]
    fn single_full_overlap_reproduces_raw_values() {
        let pairs = vec![pair("L1", 0, 1.0, Some(987.5), Some(3), Some(420))];
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        assert!(close(summary.deprivation_score_mean, 987.5));
        assert!(close(summary.deprivation_decile_mean, 3.0));
        assert!(close(summary.population_weighted, 420.0));
        assert!(close(summary.population_weighted_high_deprivation, 0.0));
        assert!(close(summary.population_pct_high_deprivation, 0.0));
        assert_eq!(summary.pair_count, 1);
    }

    #[test]
    fn weighted_means_use_overlap_weights() {
        let pairs = vec![
            pair("L1", 0, 0.75, Some(10.0), Some(10), Some(100)),
            pair("L1", 1, 0.25, Some(2.0), Some(2), Some(40)),
        ];
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        assert!(close(summary.deprivation_score_mean, 8.0));
        assert!(close(summary.deprivation_decile_mean, 8.0));
        assert!(close(summary.population_weighted, 85.0));
        assert!(close(summary.population_weighted_high_deprivation, 75.0));
        assert!(close(summary.population_pct_high_deprivation, 75.0 / 85.0 * 100.0));
    }

    #[test]
    fn missing_values_leave_both_numerator_and_denominator() {
        let pairs = vec![
            pair("L1", 0, 0.5, Some(10.0), None, Some(10)),
            pair("L1", 1, 0.5, None, Some(6), None),
            pair("L1", 2, 1.0, Some(4.0), Some(2), None),
        ];
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        // score: (10*0.5 + 4*1.0) / 1.5, decile: (6*0.5 + 2*1.0) / 1.5
        assert!(close(summary.deprivation_score_mean, 6.0));
        assert!(close(summary.deprivation_decile_mean, 5.0 / 1.5));
        assert!(close(summary.population_weighted, 5.0));
    }

    #[test]
    fn all_missing_attributes_stay_undefined() {
        let pairs = vec![pair("L1", 0, 0.6, None, None, None)];
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        assert_eq!(summary.deprivation_score_mean, None);
        assert_eq!(summary.deprivation_decile_mean, None);
        assert_eq!(summary.population_weighted, None);
        assert_eq!(summary.population_weighted_high_deprivation, None);
        assert_eq!(summary.population_pct_high_deprivation, None);
        assert_eq!(summary.pair_count, 1);
    }

    #[test]
    fn zero_population_leaves_percentage_undefined() {
        let pairs = vec![pair("L1", 0, 1.0, Some(1.0), Some(10), Some(0))];
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        assert!(close(summary.population_weighted, 0.0));
        assert!(close(summary.population_weighted_high_deprivation, 0.0));
        assert_eq!(summary.population_pct_high_deprivation, None);
    }

    #[test]
    fn zero_weight_pairs_produce_no_summary() {
        let pairs = vec![pair("L1", 0, 0.0, Some(5.0), Some(5), Some(5))];
        assert!(aggregate(&pairs, &OverlayOptions::default()).is_empty());
    }

    #[test]
    fn percentage_stays_within_bounds() {
        let pairs: Vec<OverlapPair> = (0..50u32)
            .map(|i| {
                let weight = 0.01 + f64::from(i) * 0.037 % 1.3;
                pair(
                    "L1",
                    i as usize,
                    weight,
                    Some(f64::from(i)),
                    Some(u8::try_from(i % 10 + 1).unwrap()),
                    Some(u64::from(i) * 17 + 3),
                )
            })
            .collect();
        let summary = aggregate(&pairs, &OverlayOptions::default())["L1"];
        let pct = summary.population_pct_high_deprivation.unwrap();
        assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn shuffled_input_gives_identical_summaries() {
        let pairs = vec![
            pair("L1", 0, 0.1, Some(1.1), Some(1), Some(11)),
            pair("L2", 3, 0.7, Some(3.3), Some(9), Some(33)),
            pair("L1", 1, 0.3, Some(2.2), Some(10), Some(22)),
            pair("L1", 2, 0.9, Some(7.7), Some(5), Some(77)),
            pair("L2", 4, 0.2, None, Some(10), Some(44)),
        ];
        let mut shuffled = pairs.clone();
        shuffled.reverse();
        shuffled.swap(0, 3);

        let options = OverlayOptions::default();
        assert_eq!(aggregate(&pairs, &options), aggregate(&shuffled, &options));
    }

    #[test]
    fn custom_high_deprivation_set() {
        let pairs = vec![
            pair("L1", 0, 1.0, None, Some(8), Some(10)),
            pair("L1", 1, 1.0, None, Some(10), Some(30)),
        ];
        let options = OverlayOptions {
            high_deprivation_deciles: [8].into_iter().collect(),
            ..OverlayOptions::default()
        };
        let summary = aggregate(&pairs, &options)["L1"];
        assert!(close(summary.population_weighted_high_deprivation, 10.0));
        assert!(close(summary.population_pct_high_deprivation, 25.0));
    }
}
