// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D profile definitions, areas and classification

use crate::error::{Error, Result};
use bimparam_model::{ProfileKind, RawProfile};
use nalgebra::Point2;
use std::f64::consts::PI;

/// Fill ratio at or above which a section counts as a solid rectangle
pub const RECTANGLE_FILL: f64 = 0.95;

/// Allowed deviation of the fill ratio from pi/4 for a solid circle
pub const CIRCLE_FILL_TOLERANCE: f64 = 0.05;

/// Allowed spread of vertex radii, relative to their mean, for an outline
/// to count as circular
pub const CIRCULARITY_TOLERANCE: f64 = 0.1;

/// 2D Profile with optional holes
#[derive(Debug, Clone)]
pub struct Profile2D {
    /// Outer boundary
    pub outer: Vec<Point2<f64>>,
    /// Holes
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Create a rectangular profile centered at origin
    pub fn rectangle(width: f64, height: f64) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;

        Self::new(vec![
            Point2::new(-half_w, -half_h),
            Point2::new(half_w, -half_h),
            Point2::new(half_w, half_h),
            Point2::new(-half_w, half_h),
        ])
    }

    /// Net area (outer minus holes)
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| polygon_area(h)).sum();
        (polygon_area(&self.outer) - holes).max(0.0)
    }

    /// Bounds of the outer boundary as (min, max)
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = self.outer.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.outer {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }
}

/// Absolute area of a simple polygon (shoelace formula)
pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    (twice * 0.5).abs()
}

/// Convex hull of a point set (Andrew's monotone chain), counter-clockwise
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut sorted: Vec<Point2<f64>> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Classify a section from its area and enclosing extents
pub fn classify(area: f64, major: f64, minor: f64) -> ProfileKind {
    let enclosing = major * minor;
    if enclosing <= 0.0 {
        return ProfileKind::Arbitrary;
    }
    let fill = area / enclosing;
    if fill >= RECTANGLE_FILL {
        ProfileKind::Rectangle
    } else if (fill - PI / 4.0).abs() <= CIRCLE_FILL_TOLERANCE && minor / major > 0.9 {
        ProfileKind::Circle
    } else {
        ProfileKind::Arbitrary
    }
}

/// Classify a section with a known outline
///
/// Same as [`classify`], except that an outline only counts as a circle
/// when its vertices keep a near-constant distance from their centroid.
pub fn classify_outline(outline: &[Point2<f64>], area: f64, major: f64, minor: f64) -> ProfileKind {
    match classify(area, major, minor) {
        ProfileKind::Circle if !is_circular(outline) => ProfileKind::Arbitrary,
        kind => kind,
    }
}

/// Check the vertices lie on a circle around their centroid
pub fn is_circular(outline: &[Point2<f64>]) -> bool {
    if outline.len() < 3 {
        return false;
    }
    let n = outline.len() as f64;
    let cx = outline.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = outline.iter().map(|p| p.y).sum::<f64>() / n;
    let radii: Vec<f64> = outline
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .collect();
    let mean = radii.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return false;
    }
    let (lo, hi) = radii
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(*r), hi.max(*r)));
    (hi - lo) / mean <= CIRCULARITY_TOLERANCE
}

/// Summary of a cross-section in meters
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSection {
    pub kind: ProfileKind,
    pub area: f64,
    /// Profile bounds along the profile x and y axes
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl ProfileSection {
    /// Extent along profile x
    pub fn extent_x(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    /// Extent along profile y
    pub fn extent_y(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Area divided by the enclosing rectangle
    pub fn fill_ratio(&self) -> f64 {
        let enclosing = self.extent_x() * self.extent_y();
        if enclosing > 0.0 {
            self.area / enclosing
        } else {
            0.0
        }
    }

    fn centered(kind: ProfileKind, area: f64, x: f64, y: f64) -> Self {
        Self {
            kind,
            area,
            min: [-x / 2.0, -y / 2.0],
            max: [x / 2.0, y / 2.0],
        }
    }
}

fn positive(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::profile(format!("{} must be positive, got {}", what, value)))
    }
}

/// Reduce a raw profile to its section summary, scaled to meters
pub fn section_from_raw(profile: &RawProfile, scale: f64) -> Result<ProfileSection> {
    match profile {
        RawProfile::Rectangle { x_dim, y_dim } => {
            let x = positive(x_dim * scale, "rectangle x_dim")?;
            let y = positive(y_dim * scale, "rectangle y_dim")?;
            Ok(ProfileSection::centered(ProfileKind::Rectangle, x * y, x, y))
        }
        RawProfile::Circle { radius } => {
            let r = positive(radius * scale, "circle radius")?;
            Ok(ProfileSection::centered(ProfileKind::Circle, PI * r * r, 2.0 * r, 2.0 * r))
        }
        RawProfile::CircleHollow {
            radius,
            wall_thickness,
        } => {
            let r = positive(radius * scale, "circle radius")?;
            let t = positive(wall_thickness * scale, "wall thickness")?;
            if t >= r {
                return Err(Error::profile("wall thickness must be smaller than radius"));
            }
            let inner = r - t;
            Ok(ProfileSection::centered(
                ProfileKind::Hollow,
                PI * (r * r - inner * inner),
                2.0 * r,
                2.0 * r,
            ))
        }
        RawProfile::IShape {
            overall_width,
            overall_depth,
            web_thickness,
            flange_thickness,
        } => {
            let b = positive(overall_width * scale, "overall width")?;
            let h = positive(overall_depth * scale, "overall depth")?;
            let tw = positive(web_thickness * scale, "web thickness")?;
            let tf = positive(flange_thickness * scale, "flange thickness")?;
            if 2.0 * tf >= h || tw >= b {
                return Err(Error::profile("I-shape plates exceed the overall size"));
            }
            let area = 2.0 * b * tf + (h - 2.0 * tf) * tw;
            Ok(ProfileSection::centered(ProfileKind::IShape, area, b, h))
        }
        RawProfile::Polygon { points } => {
            if points.len() < 3 {
                return Err(Error::profile("polygon needs at least 3 points"));
            }
            if points.iter().flatten().any(|c| !c.is_finite()) {
                return Err(Error::profile("polygon has non-finite coordinates"));
            }
            let outer: Vec<Point2<f64>> = points
                .iter()
                .map(|p| Point2::new(p[0] * scale, p[1] * scale))
                .collect();
            let profile = Profile2D::new(outer.clone());
            let (min, max) = profile
                .bounds()
                .ok_or_else(|| Error::profile("empty polygon"))?;
            let area = profile.area();
            if area <= 0.0 {
                return Err(Error::profile("polygon has zero area"));
            }
            let (x, y) = (max.x - min.x, max.y - min.y);
            Ok(ProfileSection {
                kind: classify_outline(&outer, area, x.max(y), x.min(y)),
                area,
                min: [min.x, min.y],
                max: [max.x, max.y],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_area() {
        let profile = Profile2D::rectangle(2.0, 0.5);
        assert_relative_eq!(profile.area(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_profile_with_hole() {
        let mut profile = Profile2D::rectangle(2.0, 2.0);
        profile.add_hole(Profile2D::rectangle(1.0, 1.0).outer);
        assert_relative_eq!(profile.area(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convex_hull_drops_interior_points() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.5),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(polygon_area(&hull), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scaled_sections() {
        let rect = section_from_raw(&RawProfile::Rectangle { x_dim: 400.0, y_dim: 300.0 }, 0.001).unwrap();
        assert_eq!(rect.kind, ProfileKind::Rectangle);
        assert_relative_eq!(rect.area, 0.12, epsilon = 1e-12);
        assert_relative_eq!(rect.fill_ratio(), 1.0, epsilon = 1e-12);

        let circle = section_from_raw(&RawProfile::Circle { radius: 0.2 }, 1.0).unwrap();
        assert_relative_eq!(circle.fill_ratio(), PI / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_classify_polygons() {
        assert_eq!(classify(1.0, 1.0, 1.0), ProfileKind::Rectangle);
        assert_eq!(classify(PI / 4.0, 1.0, 1.0), ProfileKind::Circle);
        assert_eq!(classify(0.3, 1.0, 1.0), ProfileKind::Arbitrary);

        // L-shape
        let l = RawProfile::Polygon {
            points: vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 2.0], [0.0, 2.0]],
        };
        let section = section_from_raw(&l, 1.0).unwrap();
        assert_eq!(section.kind, ProfileKind::Arbitrary);
        assert_relative_eq!(section.area, 3.0, epsilon = 1e-12);

        // Sampled circle keeps its kind
        let circle = RawProfile::Polygon {
            points: (0..64)
                .map(|i| {
                    let a = i as f64 * 2.0 * PI / 64.0;
                    [a.cos(), a.sin()]
                })
                .collect(),
        };
        assert_eq!(section_from_raw(&circle, 1.0).unwrap().kind, ProfileKind::Circle);
    }

    #[test]
    fn test_circularity() {
        let corners = [[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 2.0], [0.0, 2.0]];
        let square_notch: Vec<Point2<f64>> =
            corners.iter().map(|p| Point2::new(p[0], p[1])).collect();
        assert!(!is_circular(&square_notch));
        assert_eq!(classify_outline(&square_notch, PI, 2.0, 2.0), ProfileKind::Arbitrary);
        assert!(!is_circular(&square_notch[..2]));
    }

    #[test]
    fn test_invalid_profiles() {
        assert!(section_from_raw(&RawProfile::Circle { radius: -1.0 }, 1.0).is_err());
        assert!(section_from_raw(
            &RawProfile::CircleHollow { radius: 0.1, wall_thickness: 0.2 },
            1.0
        )
        .is_err());
    }
}
