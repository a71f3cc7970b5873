// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Distance, overlap and containment between bounding boxes

use bimparam_model::BoundingBox;

/// Separation of two boxes along each axis (zero where they overlap)
pub fn separation(a: &BoundingBox, b: &BoundingBox) -> [f64; 3] {
    let mut gap = [0.0; 3];
    for i in 0..3 {
        gap[i] = (b.min[i] - a.max[i]).max(a.min[i] - b.max[i]).max(0.0);
    }
    gap
}

/// Euclidean distance between two boxes (zero when touching or overlapping)
pub fn gap(a: &BoundingBox, b: &BoundingBox) -> f64 {
    separation(a, b).iter().map(|d| d * d).sum::<f64>().sqrt()
}

/// Overlap depth along each axis (negative where the boxes are apart)
pub fn penetration(a: &BoundingBox, b: &BoundingBox) -> [f64; 3] {
    let mut depth = [0.0; 3];
    for i in 0..3 {
        depth[i] = a.max[i].min(b.max[i]) - a.min[i].max(b.min[i]);
    }
    depth
}

/// Check if the boxes interpenetrate by more than `tolerance` on every axis
pub fn overlaps(a: &BoundingBox, b: &BoundingBox, tolerance: f64) -> bool {
    penetration(a, b).iter().all(|&d| d > tolerance)
}

/// Check if `inner` lies within `outer` grown by `tolerance`
pub fn contains(outer: &BoundingBox, inner: &BoundingBox, tolerance: f64) -> bool {
    (0..3).all(|i| {
        inner.min[i] >= outer.min[i] - tolerance && inner.max[i] <= outer.max[i] + tolerance
    })
}
