// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reduction of raw shapes to canonical geometric descriptors
//!
//! Every shape is reduced the same way regardless of how it was modeled:
//!
//! 1. Find the principal frame. Extrusions use their sweep direction when the
//!    sweep is the longest extent; point sets use PCA (eigen decomposition of
//!    the covariance); boxes use their world axes.
//! 2. Order the frame axes by extent, longest first, and canonicalize signs.
//! 3. Sample the cross-section area at `station_count` stations along the
//!    principal axis and normalize the samples to the largest one.
//!
//! All lengths are converted to meters with the source unit scale.

use crate::error::{Error, Result};
use crate::frame::{oriented_bounds, to_point, to_vector, Frame};
use crate::profile::{classify, classify_outline, convex_hull, polygon_area, section_from_raw};
use bimparam_model::{
    BoundingBox, GeometricDescriptor, ProfileKind, RawProfile, RawShape, SectionProfile,
};
use nalgebra::{Matrix3, Point2, Point3, SymmetricEigen, Vector3};

const EPSILON: f64 = 1e-9;

/// Reduce a raw shape to a descriptor
///
/// # Arguments
/// * `shape` - Raw shape in file units
/// * `unit_scale` - File units to meters
/// * `station_count` - Number of section samples along the axis
///
/// # Returns
/// `Ok(None)` for records without geometry, the descriptor otherwise
pub fn reduce_shape(
    shape: &RawShape,
    unit_scale: f64,
    station_count: usize,
) -> Result<Option<GeometricDescriptor>> {
    if !unit_scale.is_finite() || unit_scale <= 0.0 {
        return Err(Error::invalid(format!("unit scale {} must be positive", unit_scale)));
    }
    if station_count == 0 {
        return Err(Error::invalid("station count must be at least 1"));
    }

    match shape {
        RawShape::None => Ok(None),
        RawShape::Extrusion {
            profile,
            position,
            direction,
            depth,
            x_axis,
        } => reduce_extrusion(
            profile,
            *position,
            *direction,
            *depth,
            *x_axis,
            unit_scale,
            station_count,
        )
        .map(Some),
        RawShape::Points { points } => reduce_points(points, unit_scale, station_count).map(Some),
        RawShape::Box { min, max } => reduce_box(*min, *max, unit_scale, station_count).map(Some),
    }
}

fn scaled(p: [f64; 3], scale: f64) -> Point3<f64> {
    Point3::new(p[0] * scale, p[1] * scale, p[2] * scale)
}

fn check_finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::invalid(format!("{} has non-finite coordinates", what)))
    }
}

/// Frame axis with its extent
#[derive(Clone, Copy)]
struct AxisExtent {
    axis: Vector3<f64>,
    extent: f64,
}

/// Sort axes longest first; the sort is stable so ties keep input order
fn sort_axes(mut axes: [AxisExtent; 3]) -> [AxisExtent; 3] {
    axes.sort_by(|a, b| b.extent.total_cmp(&a.extent));
    axes
}

fn descriptor(
    bounds: BoundingBox,
    frame: &Frame,
    center: Point3<f64>,
    extents: [f64; 3],
    section: SectionProfile,
) -> GeometricDescriptor {
    GeometricDescriptor {
        bounds,
        axis: frame.to_principal_axis(center),
        length: extents[0],
        depth: extents[1],
        width: extents[2],
        section: Some(section),
    }
}

fn reduce_extrusion(
    profile: &RawProfile,
    position: [f64; 3],
    direction: [f64; 3],
    depth: f64,
    x_axis: Option<[f64; 3]>,
    scale: f64,
    station_count: usize,
) -> Result<GeometricDescriptor> {
    check_finite(&position, "extrusion position")?;
    check_finite(&direction, "extrusion direction")?;
    let sweep = depth * scale;
    if !sweep.is_finite() || sweep <= 0.0 {
        return Err(Error::invalid(format!("extrusion depth {} must be positive", depth)));
    }

    let section = section_from_raw(profile, scale)?;
    let profile_frame = Frame::new(to_vector(direction), x_axis.map(to_vector))?;
    let origin = scaled(position, scale);

    let bounds = oriented_bounds(
        origin,
        &profile_frame,
        [
            (0.0, sweep),
            (section.min[0], section.max[0]),
            (section.min[1], section.max[1]),
        ],
    );
    let center = origin
        + profile_frame.direction * (sweep / 2.0)
        + profile_frame.reference * ((section.min[0] + section.max[0]) / 2.0)
        + profile_frame.normal * ((section.min[1] + section.max[1]) / 2.0);

    let axes = sort_axes([
        AxisExtent {
            axis: profile_frame.direction,
            extent: sweep,
        },
        AxisExtent {
            axis: profile_frame.reference,
            extent: section.extent_x(),
        },
        AxisExtent {
            axis: profile_frame.normal,
            extent: section.extent_y(),
        },
    ]);
    let frame = Frame::new(axes[0].axis, Some(axes[1].axis))?.canonical();
    let extents = [axes[0].extent, axes[1].extent, axes[2].extent];

    let section = if (axes[0].extent - sweep).abs() <= EPSILON && axes[0].axis == profile_frame.direction {
        // Swept along its longest extent: the profile is the section
        SectionProfile::uniform(section.kind, section.area, section.fill_ratio(), station_count)
    } else {
        // Swept by its thickness (slabs, walls): use the mean section
        let area = section.area * sweep / extents[0];
        let enclosing = extents[1] * extents[2];
        let fill = if enclosing > EPSILON { area / enclosing } else { 1.0 };
        SectionProfile::uniform(classify(area, extents[1], extents[2]), area, fill, station_count)
    };

    Ok(descriptor(bounds, &frame, center, extents, section))
}

fn reduce_points(points: &[[f64; 3]], scale: f64, station_count: usize) -> Result<GeometricDescriptor> {
    if points.len() < 2 {
        return Err(Error::degenerate("point set needs at least 2 points"));
    }
    check_finite(&points.iter().flatten().copied().collect::<Vec<_>>(), "point set")?;

    let pts: Vec<Point3<f64>> = points.iter().map(|p| scaled(*p, scale)).collect();
    let n = pts.len() as f64;
    let centroid = pts.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;

    let mut covariance = Matrix3::zeros();
    for p in &pts {
        let d = p.coords - centroid;
        covariance += d * d.transpose();
    }
    covariance /= n;

    let eigen = SymmetricEigen::new(covariance);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]).then(a.cmp(&b)));
    let pca = Frame::new(
        eigen.eigenvectors.column(order[0]).into_owned(),
        Some(eigen.eigenvectors.column(order[1]).into_owned()),
    )?;

    // Reorder by actual extent, which can differ from variance order
    let extent_along = |axis: &Vector3<f64>| {
        let (lo, hi) = projection_range(&pts, &centroid, axis);
        hi - lo
    };
    let axes = sort_axes([0, 1, 2].map(|i| {
        let axis = pca.axis(i);
        AxisExtent {
            axis,
            extent: extent_along(&axis),
        }
    }));
    if axes[0].extent <= EPSILON {
        return Err(Error::degenerate("point set collapses to a point"));
    }
    let frame = Frame::new(axes[0].axis, Some(axes[1].axis))?.canonical();

    let ranges = [0, 1, 2].map(|i| projection_range(&pts, &centroid, &frame.axis(i)));
    let extents = ranges.map(|(lo, hi)| hi - lo);
    let center = Point3::from(
        centroid
            + frame.direction * ((ranges[0].0 + ranges[0].1) / 2.0)
            + frame.reference * ((ranges[1].0 + ranges[1].1) / 2.0)
            + frame.normal * ((ranges[2].0 + ranges[2].1) / 2.0),
    );

    // Section coordinates of every point
    let projected: Vec<(f64, Point2<f64>)> = pts
        .iter()
        .map(|p| {
            let d = p.coords - centroid;
            (
                d.dot(&frame.direction),
                Point2::new(d.dot(&frame.reference), d.dot(&frame.normal)),
            )
        })
        .collect();

    let all: Vec<Point2<f64>> = projected.iter().map(|(_, q)| *q).collect();
    let hull = convex_hull(&all);
    let area = polygon_area(&hull);
    let enclosing = extents[1] * extents[2];
    let (kind, fill) = if enclosing > EPSILON {
        (classify_outline(&hull, area, extents[1], extents[2]), area / enclosing)
    } else {
        (ProfileKind::Arbitrary, 1.0)
    };

    let stations = sample_stations(&projected, ranges[0], station_count);
    let bounds = BoundingBox::from_points(pts.iter().map(|p| [p.x, p.y, p.z]).collect::<Vec<_>>().iter())
        .ok_or_else(|| Error::degenerate("empty point set"))?;

    Ok(descriptor(
        bounds,
        &frame,
        center,
        extents,
        SectionProfile {
            kind,
            area,
            fill_ratio: fill,
            stations,
        },
    ))
}

fn projection_range(pts: &[Point3<f64>], centroid: &Vector3<f64>, axis: &Vector3<f64>) -> (f64, f64) {
    pts.iter()
        .map(|p| (p.coords - centroid).dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)))
}

/// Section area per station slab, normalized to the largest sample
///
/// Slabs without enough points to span an area are filled by linear
/// interpolation between their nearest sampled neighbors.
fn sample_stations(projected: &[(f64, Point2<f64>)], range: (f64, f64), count: usize) -> Vec<f64> {
    let (lo, hi) = range;
    let span = hi - lo;
    let mut slabs: Vec<Vec<Point2<f64>>> = vec![Vec::new(); count];
    for (t, q) in projected {
        let k = if span > EPSILON {
            (((t - lo) / span) * count as f64).floor() as usize
        } else {
            0
        };
        slabs[k.min(count - 1)].push(*q);
    }

    let raw: Vec<Option<f64>> = slabs
        .iter()
        .map(|slab| {
            let area = polygon_area(&convex_hull(slab));
            (area > EPSILON).then_some(area)
        })
        .collect();

    let known: Vec<usize> = (0..count).filter(|&i| raw[i].is_some()).collect();
    if known.is_empty() {
        return vec![1.0; count];
    }

    let filled: Vec<f64> = (0..count)
        .map(|i| {
            if let Some(v) = raw[i] {
                return v;
            }
            let before = known.iter().rev().find(|&&k| k < i);
            let after = known.iter().find(|&&k| k > i);
            match (before, after) {
                (Some(&a), Some(&b)) => {
                    let (va, vb) = (raw[a].unwrap_or(0.0), raw[b].unwrap_or(0.0));
                    va + (vb - va) * (i - a) as f64 / (b - a) as f64
                }
                (Some(&a), None) => raw[a].unwrap_or(0.0),
                (None, Some(&b)) => raw[b].unwrap_or(0.0),
                (None, None) => 0.0,
            }
        })
        .collect();

    let max = filled.iter().cloned().fold(0.0, f64::max);
    if max <= EPSILON {
        return vec![1.0; count];
    }
    filled.iter().map(|v| v / max).collect()
}

fn reduce_box(min: [f64; 3], max: [f64; 3], scale: f64, station_count: usize) -> Result<GeometricDescriptor> {
    check_finite(&min, "box")?;
    check_finite(&max, "box")?;
    let bounds = BoundingBox::new(min.map(|v| v * scale), max.map(|v| v * scale));
    let e = bounds.extents();

    let axes = sort_axes([0, 1, 2].map(|i| {
        let mut axis = Vector3::zeros();
        axis[i] = 1.0;
        AxisExtent { axis, extent: e[i] }
    }));
    if axes[0].extent <= EPSILON {
        return Err(Error::degenerate("box collapses to a point"));
    }
    let frame = Frame::new(axes[0].axis, Some(axes[1].axis))?.canonical();
    let extents = [axes[0].extent, axes[1].extent, axes[2].extent];
    let area = extents[1] * extents[2];

    Ok(descriptor(
        bounds,
        &frame,
        to_point(bounds.center()),
        extents,
        SectionProfile::uniform(ProfileKind::Rectangle, area, 1.0, station_count),
    ))
}
