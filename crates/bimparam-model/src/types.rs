// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core identifiers and the semantic category enumeration
//!
//! This module defines the fundamental types used throughout the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable element identifier
///
/// Wraps the identifier assigned by the source model (typically an IFC
/// GlobalId). Ordering is lexicographic so that every collection keyed by
/// element id iterates deterministically.
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    /// Create a new element id
    pub fn new(id: impl Into<String>) -> Self {
        ElementId(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        ElementId(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        ElementId(id)
    }
}

/// Template identity (shared by every version of a template)
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl TemplateId {
    /// Create a new template id
    pub fn new(id: impl Into<String>) -> Self {
        TemplateId(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        TemplateId(id.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        TemplateId(id)
    }
}

/// Semantic category of a building element
///
/// Every normalized element resolves to exactly one category. Records whose
/// type cannot be resolved are kept under [`SemanticCategory::Unknown`].
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SemanticCategory {
    // Structure
    Column,
    Beam,
    Member,
    Slab,
    Wall,
    Roof,
    Plate,
    Foundation,
    Stair,
    Covering,

    // Distribution systems
    Duct,
    Pipe,

    #[default]
    Unknown,
}

/// Shape family a category maps to
///
/// Determines how the three principal extents of an element are interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFamily {
    /// Long members: extent along the axis plus a cross-section
    Linear,
    /// Sheets: two spanning extents plus a thickness
    Planar,
    /// Bulky elements: three comparable extents
    Volumetric,
    /// No known interpretation
    Unclassified,
}

impl SemanticCategory {
    /// All known categories (excluding `Unknown`)
    pub const KNOWN: [SemanticCategory; 12] = [
        SemanticCategory::Column,
        SemanticCategory::Beam,
        SemanticCategory::Member,
        SemanticCategory::Slab,
        SemanticCategory::Wall,
        SemanticCategory::Roof,
        SemanticCategory::Plate,
        SemanticCategory::Foundation,
        SemanticCategory::Stair,
        SemanticCategory::Covering,
        SemanticCategory::Duct,
        SemanticCategory::Pipe,
    ];

    /// Lowercase name, used in template ids and lookups
    pub fn name(&self) -> &'static str {
        match self {
            SemanticCategory::Column => "column",
            SemanticCategory::Beam => "beam",
            SemanticCategory::Member => "member",
            SemanticCategory::Slab => "slab",
            SemanticCategory::Wall => "wall",
            SemanticCategory::Roof => "roof",
            SemanticCategory::Plate => "plate",
            SemanticCategory::Foundation => "foundation",
            SemanticCategory::Stair => "stair",
            SemanticCategory::Covering => "covering",
            SemanticCategory::Duct => "duct",
            SemanticCategory::Pipe => "pipe",
            SemanticCategory::Unknown => "unknown",
        }
    }

    /// Check if this is a resolved category
    pub fn is_known(&self) -> bool {
        *self != SemanticCategory::Unknown
    }

    /// Shape family used to interpret principal extents
    pub fn shape_family(&self) -> ShapeFamily {
        match self {
            SemanticCategory::Column
            | SemanticCategory::Beam
            | SemanticCategory::Member
            | SemanticCategory::Duct
            | SemanticCategory::Pipe => ShapeFamily::Linear,
            SemanticCategory::Slab
            | SemanticCategory::Wall
            | SemanticCategory::Roof
            | SemanticCategory::Plate
            | SemanticCategory::Covering => ShapeFamily::Planar,
            SemanticCategory::Foundation | SemanticCategory::Stair => ShapeFamily::Volumetric,
            SemanticCategory::Unknown => ShapeFamily::Unclassified,
        }
    }

    /// Names of the three principal extents, longest first
    ///
    /// For linear members the second extent is the major section dimension
    /// (called depth) and the third the minor one (called width).
    pub fn dimension_names(&self) -> [&'static str; 3] {
        match self {
            SemanticCategory::Column => ["height", "depth", "width"],
            SemanticCategory::Beam => ["span", "depth", "width"],
            SemanticCategory::Member | SemanticCategory::Duct | SemanticCategory::Pipe => {
                ["length", "depth", "width"]
            }
            SemanticCategory::Wall => ["length", "height", "thickness"],
            SemanticCategory::Slab
            | SemanticCategory::Roof
            | SemanticCategory::Plate
            | SemanticCategory::Covering => ["length", "width", "thickness"],
            SemanticCategory::Foundation => ["length", "width", "depth"],
            SemanticCategory::Stair => ["run", "width", "rise"],
            SemanticCategory::Unknown => ["major", "middle", "minor"],
        }
    }
}

impl fmt::Display for SemanticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticCategory {
    type Err = std::convert::Infallible;

    /// Parse a category name; unresolved names map to `Unknown`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Ok(SemanticCategory::KNOWN
            .iter()
            .copied()
            .find(|c| c.name() == lower)
            .unwrap_or(SemanticCategory::Unknown))
    }
}
