// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orthonormal frames and oriented boxes

use crate::error::{Error, Result};
use bimparam_model::{BoundingBox, PrincipalAxis};
use nalgebra::{Point3, Vector3};

const EPSILON: f64 = 1e-9;

/// Flip a vector so that its largest-magnitude component is positive
///
/// Ties go to the lowest axis index, so opposite vectors always map to the
/// same canonical direction.
pub fn canonical_sign(v: Vector3<f64>) -> Vector3<f64> {
    let mut dominant = 0;
    for i in 1..3 {
        if v[i].abs() > v[dominant].abs() + EPSILON {
            dominant = i;
        }
    }
    if v[dominant] < 0.0 {
        -v
    } else {
        v
    }
}

/// Right-handed orthonormal frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Principal axis
    pub direction: Vector3<f64>,
    /// Major section axis
    pub reference: Vector3<f64>,
    /// Minor section axis
    pub normal: Vector3<f64>,
}

impl Frame {
    /// Build a frame from a direction and an optional reference hint
    ///
    /// The hint is projected onto the plane normal to `direction`; when it is
    /// missing or parallel, the world axis least aligned with `direction` is
    /// used instead.
    pub fn new(direction: Vector3<f64>, hint: Option<Vector3<f64>>) -> Result<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm < EPSILON {
            return Err(Error::degenerate("zero-length direction"));
        }
        let direction = direction / norm;

        let project = |h: Vector3<f64>| {
            let r = h - direction * h.dot(&direction);
            let n = r.norm();
            (n.is_finite() && n > EPSILON).then(|| r / n)
        };

        let reference = hint.and_then(project).or_else(|| {
            let mut least = 0;
            for i in 1..3 {
                if direction[i].abs() < direction[least].abs() - EPSILON {
                    least = i;
                }
            }
            let mut axis = Vector3::zeros();
            axis[least] = 1.0;
            project(axis)
        });
        let reference = reference.ok_or_else(|| Error::degenerate("cannot build reference axis"))?;

        Ok(Self {
            direction,
            reference,
            normal: direction.cross(&reference),
        })
    }

    /// Frame with canonical signs on direction and reference
    pub fn canonical(self) -> Self {
        let direction = canonical_sign(self.direction);
        let reference = canonical_sign(self.reference);
        Self {
            direction,
            reference,
            normal: direction.cross(&reference),
        }
    }

    /// Axis `i` of the frame (0 direction, 1 reference, 2 normal)
    pub fn axis(&self, i: usize) -> Vector3<f64> {
        match i {
            0 => self.direction,
            1 => self.reference,
            _ => self.normal,
        }
    }

    /// Principal axis record centered at `origin`
    pub fn to_principal_axis(&self, origin: Point3<f64>) -> PrincipalAxis {
        PrincipalAxis {
            origin: [origin.x, origin.y, origin.z],
            direction: [self.direction.x, self.direction.y, self.direction.z],
            reference: [self.reference.x, self.reference.y, self.reference.z],
        }
    }
}

/// World bounds of a box given in frame coordinates
///
/// `ranges[i]` is the (min, max) extent along frame axis `i`, measured from
/// `origin`.
pub fn oriented_bounds(origin: Point3<f64>, frame: &Frame, ranges: [(f64, f64); 3]) -> BoundingBox {
    let mut corners = Vec::with_capacity(8);
    for &a in &[ranges[0].0, ranges[0].1] {
        for &b in &[ranges[1].0, ranges[1].1] {
            for &c in &[ranges[2].0, ranges[2].1] {
                let p = origin + frame.direction * a + frame.reference * b + frame.normal * c;
                corners.push([p.x, p.y, p.z]);
            }
        }
    }
    // Eight corners, so the box always exists
    BoundingBox::from_points(corners.iter()).unwrap_or_default()
}

/// Convert a model vector into nalgebra
pub fn to_vector(v: [f64; 3]) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

/// Convert a model point into nalgebra
pub fn to_point(p: [f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}
