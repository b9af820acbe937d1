//! Candidate pair discovery between localities and subdivisions.
//!
//! Each locality's envelope is queried against the subdivision R-tree and
//! the bounding-box hits are confirmed with an exact intersects test.

use std::collections::BTreeSet;

use geo::Intersects;
use rayon::prelude::*;

use crate::GeometryStore;

/// A (locality, subdivision) pair whose geometries intersect, by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePair {
    pub locality_index: usize,
    pub subdivision_index: usize,
}

impl GeometryStore {
    /// Subdivision ordinals intersecting the locality at `locality_index`,
    /// in ascending order. Unknown indices yield no candidates.
    #[must_use]
    pub fn find_candidates(&self, locality_index: usize) -> Vec<usize> {
        let Some(entry) = self.locality(locality_index) else {
            return Vec::new();
        };

        let mut hits: Vec<usize> = self
            .subdivision_tree
            .locate_in_envelope_intersecting(&entry.envelope)
            .map(|boundary| boundary.index)
            .filter(|&j| {
                entry
                    .locality
                    .geometry
                    .intersects(&self.subdivisions[j].subdivision.geometry)
            })
            .collect();

        hits.sort_unstable();
        hits
    }

    /// Keys of the subdivisions intersecting the locality at `locality_index`.
    #[must_use]
    pub fn candidate_keys(&self, locality_index: usize) -> BTreeSet<&str> {
        self.find_candidates(locality_index)
            .into_iter()
            .map(|j| self.subdivisions[j].subdivision.key.as_str())
            .collect()
    }

    /// Every intersecting pair across the store, ordered by locality then
    /// subdivision ordinal. Localities are searched in parallel.
    #[must_use]
    pub fn candidate_pairs(&self) -> Vec<CandidatePair> {
        let pairs: Vec<CandidatePair> = (0..self.localities.len())
            .into_par_iter()
            .flat_map_iter(|locality_index| {
                self.find_candidates(locality_index)
                    .into_iter()
                    .map(move |subdivision_index| CandidatePair {
                        locality_index,
                        subdivision_index,
                    })
            })
            .collect();

        log::info!(
            "Found {} candidate pairs across {} localities",
            pairs.len(),
            self.localities.len()
        );

        pairs
    }
}
