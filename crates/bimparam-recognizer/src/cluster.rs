// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Centroid-linkage agglomerative clustering
//!
//! Starts from singletons and repeatedly merges the closest pair of clusters
//! while their centroid distance stays within the threshold. Ties are broken
//! by the smallest member index of each cluster, so the result depends only
//! on the order of the input signatures.

use crate::options::RecognizerOptions;
use crate::signature::Signature;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Best merge candidate: distance, then the first members of both clusters
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    first: (usize, usize),
    slots: (usize, usize),
}

impl Candidate {
    fn cmp_key(&self, other: &Candidate) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.first.cmp(&other.first))
    }
}

struct Cluster {
    /// Indices into the signature slice, ascending
    members: Vec<usize>,
    centroid: Signature,
}

/// Group signatures into clusters
///
/// # Arguments
/// * `signatures` - Signatures ordered by element id
/// * `options` - Threshold and weights
///
/// # Returns
/// Clusters as ascending index lists, ordered by their smallest index
pub fn agglomerate(signatures: &[Signature], options: &RecognizerOptions) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Option<Cluster>> = signatures
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Some(Cluster {
                members: vec![i],
                centroid: s.clone(),
            })
        })
        .collect();

    let threshold = options.similarity_threshold;
    loop {
        let best = (0..clusters.len())
            .into_par_iter()
            .filter_map(|i| {
                let a = clusters[i].as_ref()?;
                clusters
                    .iter()
                    .enumerate()
                    .skip(i + 1)
                    .filter_map(|(j, b)| {
                        let b = b.as_ref()?;
                        let distance = a.centroid.distance(&b.centroid, options);
                        (distance <= threshold).then(|| Candidate {
                            distance,
                            first: order(a.members[0], b.members[0]),
                            slots: (i, j),
                        })
                    })
                    .min_by(Candidate::cmp_key)
            })
            .min_by(Candidate::cmp_key);

        let Some(candidate) = best else { break };
        let (i, j) = candidate.slots;
        let (Some(a), Some(b)) = (clusters[i].take(), clusters[j].take()) else {
            break;
        };

        let mut members = a.members;
        members.extend(b.members);
        members.sort_unstable();
        let member_signatures: Vec<&Signature> = members.iter().map(|&m| &signatures[m]).collect();
        let centroid = Signature::centroid(&member_signatures).unwrap_or(a.centroid);
        log::trace!(
            "Merged clusters at {} and {} (distance {:.4}, {} members)",
            candidate.first.0,
            candidate.first.1,
            candidate.distance,
            members.len()
        );
        clusters[i] = Some(Cluster { members, centroid });
    }

    let mut result: Vec<Vec<usize>> = clusters
        .into_iter()
        .flatten()
        .map(|c| c.members)
        .collect();
    result.sort_by_key(|members| members[0]);
    result
}

fn order(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimparam_model::ProfileKind;

    fn signature(length: f64, profile: ProfileKind) -> Signature {
        Signature {
            profile,
            keys: Vec::new(),
            dimensions: [length, 0.4, 0.4],
            fill_ratio: 1.0,
            stations: vec![1.0; 3],
            numeric: Vec::new(),
        }
    }

    #[test]
    fn test_similar_merge_dissimilar_stay_apart() {
        let signatures = vec![
            signature(3.0, ProfileKind::Rectangle),
            signature(3.05, ProfileKind::Rectangle),
            signature(3.1, ProfileKind::Rectangle),
            signature(9.0, ProfileKind::Rectangle),
        ];
        let clusters = agglomerate(&signatures, &RecognizerOptions::default());
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_profiles_never_merge() {
        let signatures = vec![
            signature(3.0, ProfileKind::Rectangle),
            signature(3.0, ProfileKind::Circle),
        ];
        let clusters = agglomerate(&signatures, &RecognizerOptions::default());
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_tie_break_by_smallest_member() {
        // 0 and 2 are both exactly as far from 1; the pair (0, 1) merges first,
        // after which the centroid is farther from 2 than the threshold allows.
        let signatures = vec![
            signature(1.0, ProfileKind::Rectangle),
            signature(2.0, ProfileKind::Rectangle),
            signature(4.0, ProfileKind::Rectangle),
        ];
        let options = RecognizerOptions::default().with_threshold(0.3);
        let clusters = agglomerate(&signatures, &options);
        assert_eq!(clusters, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(agglomerate(&[], &RecognizerOptions::default()).is_empty());
    }
}
