// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial relations and axis-aligned bounds

use crate::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of spatial relation between two elements or instances
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Bounding extents touch
    Adjacency,
    /// One element lies inside the other
    Containment,
    /// Physical connection (joint, fitting)
    Connection,
}

impl RelationKind {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Adjacency => "adjacency",
            RelationKind::Containment => "containment",
            RelationKind::Connection => "connection",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference from one element to another
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationRef {
    /// Relation kind
    pub kind: RelationKind,
    /// Target element id
    pub target: ElementId,
}

impl RelationRef {
    /// Create a new relation reference
    pub fn new(kind: RelationKind, target: impl Into<ElementId>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

/// Axis-aligned bounding box in meters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: [f64; 3],
    /// Maximum corner
    pub max: [f64; 3],
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }
}

impl BoundingBox {
    /// Create a box from two corners (normalized so that min <= max)
    pub fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for i in 0..3 {
            min[i] = a[i].min(b[i]);
            max[i] = a[i].max(b[i]);
        }
        Self { min, max }
    }

    /// Create a box centered at `center` with the given full extents
    pub fn from_center(center: [f64; 3], extents: [f64; 3]) -> Self {
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for i in 0..3 {
            let half = extents[i].abs() * 0.5;
            min[i] = center[i] - half;
            max[i] = center[i] + half;
        }
        Self { min, max }
    }

    /// Smallest box containing every point
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; 3]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = BoundingBox {
            min: *first,
            max: *first,
        };
        for p in iter {
            bounds.expand(p);
        }
        Some(bounds)
    }

    /// Grow the box to include a point
    pub fn expand(&mut self, p: &[f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    /// Extent along each axis
    pub fn extents(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Center point
    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Box volume
    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e[0] * e[1] * e[2]
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        out.expand(&other.min);
        out.expand(&other.max);
        out
    }

    /// Box moved by an offset
    pub fn translated(&self, offset: [f64; 3]) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0] + offset[0],
                self.min[1] + offset[1],
                self.min[2] + offset[2],
            ],
            max: [
                self.max[0] + offset[0],
                self.max[1] + offset[1],
                self.max[2] + offset[2],
            ],
        }
    }

    /// Box grown by `margin` on every side
    pub fn grown(&self, margin: f64) -> BoundingBox {
        BoundingBox {
            min: [
                self.min[0] - margin,
                self.min[1] - margin,
                self.min[2] - margin,
            ],
            max: [
                self.max[0] + margin,
                self.max[1] + margin,
                self.max[2] + margin,
            ],
        }
    }

    /// Check every coordinate is finite
    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }
}

/// Principal axis of an element
///
/// `direction` is the unit vector along the longest principal extent with a
/// canonical sign; `reference` is the unit vector of the major section axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxis {
    /// Point on the axis (centroid)
    pub origin: [f64; 3],
    /// Unit direction of the axis
    pub direction: [f64; 3],
    /// Unit direction of the major section dimension
    pub reference: [f64; 3],
}

impl Default for PrincipalAxis {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            reference: [1.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_normalizes_corners() {
        let b = BoundingBox::new([1.0, 0.0, 5.0], [0.0, 2.0, 3.0]);
        assert_eq!(b.min, [0.0, 0.0, 3.0]);
        assert_eq!(b.max, [1.0, 2.0, 5.0]);
        assert_eq!(b.extents(), [1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_box_from_center() {
        let b = BoundingBox::from_center([0.0, 0.0, 1.5], [0.4, 0.4, 3.0]);
        assert_eq!(b.min, [-0.2, -0.2, 0.0]);
        assert_eq!(b.max, [0.2, 0.2, 3.0]);
    }

    #[test]
    fn test_union_and_translate() {
        let a = BoundingBox::new([0.0; 3], [1.0; 3]);
        let b = a.translated([2.0, 0.0, 0.0]);
        let u = a.union(&b);
        assert_eq!(u.extents(), [3.0, 1.0, 1.0]);
        assert_eq!(BoundingBox::from_points([&[0.0; 3], &[1.0; 3]]), Some(a));
    }
}
