// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric descriptors and per-family shape records

use crate::{BoundingBox, PrincipalAxis, SemanticCategory, ShapeFamily};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cross-section profile classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Solid rectangle (fill ratio ~1)
    Rectangle,
    /// Solid circle (fill ratio ~pi/4, equal extents)
    Circle,
    /// I/H shaped steel section
    IShape,
    /// Hollow section (tube, box)
    Hollow,
    /// Anything else
    Arbitrary,
}

impl ProfileKind {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::Rectangle => "rectangle",
            ProfileKind::Circle => "circle",
            ProfileKind::IShape => "i_shape",
            ProfileKind::Hollow => "hollow",
            ProfileKind::Arbitrary => "arbitrary",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sampled cross-section of an element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionProfile {
    /// Profile classification
    pub kind: ProfileKind,
    /// Section area in m²
    pub area: f64,
    /// Area divided by the enclosing rectangle (depth × width)
    pub fill_ratio: f64,
    /// Section area samples along the axis, normalized to the largest sample
    pub stations: Vec<f64>,
}

impl SectionProfile {
    /// Uniform section sampled at `count` stations
    pub fn uniform(kind: ProfileKind, area: f64, fill_ratio: f64, count: usize) -> Self {
        Self {
            kind,
            area,
            fill_ratio,
            stations: vec![1.0; count],
        }
    }
}

/// Canonical geometric descriptor of an element or instance
///
/// Extents are the principal extents in meters sorted longest first:
/// `length` runs along the principal axis, `depth` along the reference
/// (major section) axis and `width` along the remaining axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometricDescriptor {
    /// World axis-aligned bounds
    pub bounds: BoundingBox,
    /// Principal axis and orientation
    pub axis: PrincipalAxis,
    /// Extent along the principal axis
    pub length: f64,
    /// Major section extent
    pub depth: f64,
    /// Minor section extent
    pub width: f64,
    /// Cross-section, when the element has one
    pub section: Option<SectionProfile>,
}

impl GeometricDescriptor {
    /// Principal extents, longest first
    pub fn dimensions(&self) -> [f64; 3] {
        [self.length, self.depth, self.width]
    }

    /// Section area, falling back to the enclosing rectangle
    pub fn section_area(&self) -> f64 {
        self.section
            .as_ref()
            .map(|s| s.area)
            .unwrap_or(self.depth * self.width)
    }

    /// Enclosed volume estimate
    pub fn volume(&self) -> f64 {
        self.length * self.section_area()
    }
}

/// Explicit shape record per shape family
///
/// Derived from the category, so that downstream code never has to guess
/// which attributes an element carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ShapeRecord {
    /// Columns, beams, members, pipes, ducts
    Linear {
        axis_length: f64,
        section_depth: f64,
        section_width: f64,
    },
    /// Slabs, walls, roofs, plates, coverings
    Planar {
        length: f64,
        width: f64,
        thickness: f64,
    },
    /// Foundations, stairs
    Volumetric { length: f64, width: f64, depth: f64 },
    /// Category could not be resolved
    Unclassified { type_tag: String },
}

impl ShapeRecord {
    /// Build the record for a category from its descriptor
    pub fn from_descriptor(
        category: SemanticCategory,
        type_tag: &str,
        descriptor: &GeometricDescriptor,
    ) -> Self {
        let [a, b, c] = descriptor.dimensions();
        match category.shape_family() {
            ShapeFamily::Linear => ShapeRecord::Linear {
                axis_length: a,
                section_depth: b,
                section_width: c,
            },
            ShapeFamily::Planar => ShapeRecord::Planar {
                length: a,
                width: b,
                thickness: c,
            },
            ShapeFamily::Volumetric => ShapeRecord::Volumetric {
                length: a,
                width: b,
                depth: c,
            },
            ShapeFamily::Unclassified => ShapeRecord::Unclassified {
                type_tag: type_tag.to_string(),
            },
        }
    }

    /// Shape family of the record
    pub fn family(&self) -> ShapeFamily {
        match self {
            ShapeRecord::Linear { .. } => ShapeFamily::Linear,
            ShapeRecord::Planar { .. } => ShapeFamily::Planar,
            ShapeRecord::Volumetric { .. } => ShapeFamily::Volumetric,
            ShapeRecord::Unclassified { .. } => ShapeFamily::Unclassified,
        }
    }

    /// Principal extents in family order, if classified
    pub fn dimensions(&self) -> Option<[f64; 3]> {
        match self {
            ShapeRecord::Linear {
                axis_length,
                section_depth,
                section_width,
            } => Some([*axis_length, *section_depth, *section_width]),
            ShapeRecord::Planar {
                length,
                width,
                thickness,
            } => Some([*length, *width, *thickness]),
            ShapeRecord::Volumetric {
                length,
                width,
                depth,
            } => Some([*length, *width, *depth]),
            ShapeRecord::Unclassified { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> GeometricDescriptor {
        GeometricDescriptor {
            bounds: BoundingBox::new([0.0; 3], [0.4, 0.3, 3.0]),
            axis: PrincipalAxis::default(),
            length: 3.0,
            depth: 0.4,
            width: 0.3,
            section: Some(SectionProfile::uniform(ProfileKind::Rectangle, 0.12, 1.0, 5)),
        }
    }

    #[test]
    fn test_linear_record() {
        let record = ShapeRecord::from_descriptor(SemanticCategory::Column, "IfcColumn", &descriptor());
        assert_eq!(record.family(), ShapeFamily::Linear);
        assert_eq!(record.dimensions(), Some([3.0, 0.4, 0.3]));
    }

    #[test]
    fn test_unclassified_record_keeps_tag() {
        let record = ShapeRecord::from_descriptor(SemanticCategory::Unknown, "IfcGizmo", &descriptor());
        assert_eq!(
            record,
            ShapeRecord::Unclassified {
                type_tag: "IfcGizmo".to_string()
            }
        );
        assert!(record.dimensions().is_none());
    }

    #[test]
    fn test_section_area_fallback() {
        let mut d = descriptor();
        d.section = None;
        assert!((d.section_area() - 0.12).abs() < 1e-12);
    }
}
