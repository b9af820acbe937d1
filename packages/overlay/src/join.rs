//! Left-outer join of subdivision attributes onto weighted pairs.

use std::collections::BTreeSet;

use deprivation_overlay_models::{AttributeTable, OverlapPair, OverlayWarning};
use deprivation_spatial::GeometryStore;

use crate::quantify::WeightedPair;

/// Pairs with attributes attached, plus one warning per subdivision key
/// that had no attribute row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedPairs {
    pub pairs: Vec<OverlapPair>,
    pub warnings: Vec<OverlayWarning>,
}

/// Attaches attributes to every pair by subdivision key.
///
/// Subdivisions without an attribute row keep the pair with all attributes
/// missing.
///
/// # Panics
///
/// Panics if a pair references an ordinal that is not in `store`.
#[must_use]
pub fn join_attributes(
    store: &GeometryStore,
    pairs: &[WeightedPair],
    attributes: &AttributeTable,
) -> JoinedPairs {
    let mut missing: BTreeSet<&str> = BTreeSet::new();

    let joined = pairs
        .iter()
        .map(|pair| {
            let locality = &store.localities()[pair.locality_index].locality;
            let key = store.subdivisions()[pair.subdivision_index]
                .subdivision
                .key
                .as_str();

            let row = attributes.get(key).copied().unwrap_or_else(|| {
                if missing.insert(key) {
                    log::debug!("No attribute row for subdivision {key}");
                }
                Default::default()
            });

            OverlapPair {
                locality_id: locality.id.clone(),
                subdivision_key: key.to_string(),
                subdivision_index: pair.subdivision_index,
                intersection_area: pair.intersection_area,
                subdivision_geometry_area: pair.subdivision_geometry_area,
                overlap_weight: pair.overlap_weight,
                attributes: row,
            }
        })
        .collect();

    if !missing.is_empty() {
        log::info!(
            "{} overlapping subdivisions have no attribute row; treating as missing",
            missing.len()
        );
    }

    JoinedPairs {
        pairs: joined,
        warnings: missing
            .into_iter()
            .map(|key| OverlayWarning::MissingJoinAttribute {
                subdivision_key: key.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use deprivation_overlay_models::{
        Locality, OverlayOptions, Subdivision, SubdivisionAttributes,
    };

    use super::*;
    use crate::progress::NullProgress;
    use crate::quantify::quantify;
    use crate::test_support::rect;

    #[test]
    fn missing_rows_become_missing_attributes() {
        let store = GeometryStore::load(
            vec![
                Locality::new("L1", Some("A".to_string()), rect(0.0, 0.0, 2.0, 2.0)),
                Locality::new("L2", Some("B".to_string()), rect(2.0, 0.0, 4.0, 2.0)),
            ],
            vec![
                Subdivision::new("S1", rect(0.0, 0.0, 1.0, 1.0), Some(1.0)),
                Subdivision::new("S2", rect(1.0, 0.0, 3.0, 1.0), Some(2.0)),
            ],
        )
        .unwrap();
        let weighted = quantify(
            &store,
            &store.candidate_pairs(),
            &OverlayOptions::default(),
            &NullProgress,
        );

        let mut attributes = AttributeTable::new();
        attributes.insert(
            "S1".to_string(),
            SubdivisionAttributes {
                deprivation_score: Some(950.0),
                deprivation_decile: Some(4),
                urban_rural_population: Some(300),
            },
        );

        let joined = join_attributes(&store, &weighted.pairs, &attributes);

        assert_eq!(joined.pairs.len(), 3);
        assert_eq!(joined.pairs[0].subdivision_key, "S1");
        assert_eq!(joined.pairs[0].attributes.deprivation_decile, Some(4));
        assert_eq!(joined.pairs[1].subdivision_key, "S2");
        assert_eq!(joined.pairs[1].attributes, SubdivisionAttributes::default());
        assert_eq!(joined.pairs[2].locality_id, "L2");

        // S2 overlaps both localities but is reported once.
        assert_eq!(
            joined.warnings,
            vec![OverlayWarning::MissingJoinAttribute {
                subdivision_key: "S2".to_string()
            }]
        );
    }
}
