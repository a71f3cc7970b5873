// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw element records (parser side) and normalized elements

use crate::{
    ElementId, GeometricDescriptor, PropertyMap, PropertyValue, RelationKind, RelationRef,
    SemanticCategory, ShapeRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 2D profile of an extruded solid, in file units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawProfile {
    /// Rectangle centered on the profile origin
    Rectangle { x_dim: f64, y_dim: f64 },
    /// Solid circle
    Circle { radius: f64 },
    /// Tube
    CircleHollow { radius: f64, wall_thickness: f64 },
    /// I/H section
    IShape {
        overall_width: f64,
        overall_depth: f64,
        web_thickness: f64,
        flange_thickness: f64,
    },
    /// Closed polygon (last point connects to the first)
    Polygon { points: Vec<[f64; 2]> },
}

/// Shape carried by a raw record, in file units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawShape {
    /// Profile swept along a direction
    Extrusion {
        profile: RawProfile,
        /// Profile origin (center of the base section)
        position: [f64; 3],
        /// Extrusion direction (need not be unit length)
        direction: [f64; 3],
        /// Extrusion depth
        depth: f64,
        /// Profile x axis; derived from `direction` when absent
        #[serde(default)]
        x_axis: Option<[f64; 3]>,
    },
    /// Sampled surface or vertex cloud
    Points { points: Vec<[f64; 3]> },
    /// Axis-aligned box
    Box { min: [f64; 3], max: [f64; 3] },
    /// No geometric representation
    #[default]
    None,
}

impl RawShape {
    /// Check if the record has any geometry
    pub fn is_none(&self) -> bool {
        matches!(self, RawShape::None)
    }
}

/// Relation reference in a raw record (target not yet checked)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRelation {
    pub kind: RelationKind,
    pub target: String,
}

/// Raw element record as produced by a parser
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    /// Source identifier
    pub id: String,
    /// Type tag (e.g. "IfcColumn", "IFCBEAM", "column")
    pub type_tag: String,
    /// Object name (may encode a path such as "Site/IfcBeam/B-12")
    pub name: Option<String>,
    /// Storey name
    pub storey: Option<String>,
    /// Geometry
    pub shape: RawShape,
    /// Properties in source order; repeated keys allowed
    pub properties: Vec<(String, PropertyValue)>,
    /// Relations to other records
    pub relations: Vec<RawRelation>,
}

impl RawElement {
    /// Create a record with no geometry, properties or relations
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            name: None,
            storey: None,
            shape: RawShape::None,
            properties: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the object name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the storey
    pub fn with_storey(mut self, storey: impl Into<String>) -> Self {
        self.storey = Some(storey.into());
        self
    }

    /// Set the shape
    pub fn with_shape(mut self, shape: RawShape) -> Self {
        self.shape = shape;
        self
    }

    /// Append a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Append a relation
    pub fn with_relation(mut self, kind: RelationKind, target: impl Into<String>) -> Self {
        self.relations.push(RawRelation {
            kind,
            target: target.into(),
        });
        self
    }
}

/// Canonical, immutable element record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedElement {
    pub id: ElementId,
    pub category: SemanticCategory,
    pub type_tag: String,
    pub name: Option<String>,
    pub storey: Option<String>,
    /// Reduced geometry; `None` when the record had no usable shape
    pub descriptor: Option<GeometricDescriptor>,
    pub shape: ShapeRecord,
    pub properties: PropertyMap,
    pub relations: BTreeSet<RelationRef>,
}

impl NormalizedElement {
    /// Look up a property
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Relations of a given kind
    pub fn relations_of(&self, kind: RelationKind) -> impl Iterator<Item = &RelationRef> {
        self.relations.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let element = RawElement::new("C1", "IfcColumn")
            .with_name("Column/C1")
            .with_storey("Level 1")
            .with_shape(RawShape::Box {
                min: [0.0; 3],
                max: [0.3, 0.3, 3.0],
            })
            .with_property("Material", "concrete")
            .with_relation(RelationKind::Connection, "B1");

        assert_eq!(element.id, "C1");
        assert_eq!(element.storey.as_deref(), Some("Level 1"));
        assert_eq!(element.properties.len(), 1);
        assert_eq!(element.relations[0].target, "B1");
        assert!(!element.shape.is_none());
    }

    #[test]
    fn test_shape_json_tag() {
        let shape = RawShape::Extrusion {
            profile: RawProfile::Circle { radius: 0.2 },
            position: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            depth: 3.0,
            x_axis: None,
        };
        let json = serde_json::to_string(&shape).unwrap();
        assert!(json.contains(r#""kind":"extrusion""#));
        let back: RawShape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }
}
