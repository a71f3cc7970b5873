// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # BimParam Geometry
//!
//! Geometric building blocks for the decomposition pipeline.
//!
//! ## Overview
//!
//! - **Reduction**: raw shapes (extrusions, point sets, boxes) to canonical
//!   descriptors (principal frame, extents, section samples)
//! - **Generation**: evaluate a template's generative rule at a parameter
//!   assignment
//! - **Proximity**: box gaps, penetration and containment for relation and
//!   collision checks
//! - **Tiling**: cover a building footprint with fixed-size modules
//! - **Alignment**: displacement bringing one element group onto another,
//!   matched storey by storey
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bimparam_geometry::reduce_shape;
//! use bimparam_model::{RawProfile, RawShape};
//!
//! let shape = RawShape::Extrusion {
//!     profile: RawProfile::Rectangle { x_dim: 400.0, y_dim: 400.0 },
//!     position: [0.0, 0.0, 0.0],
//!     direction: [0.0, 0.0, 1.0],
//!     depth: 3000.0,
//!     x_axis: None,
//! };
//! let descriptor = reduce_shape(&shape, 0.001, 5)?.unwrap();
//! println!("{:.2} m long", descriptor.length);
//! ```

pub mod alignment;
pub mod error;
pub mod frame;
pub mod generate;
pub mod profile;
pub mod proximity;
pub mod reduction;
pub mod tiling;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

// Re-export main types
pub use alignment::{
    align_groups, storey_key, storey_references, AlignmentOptions, GroupAlignment, StoreyMatch,
    StoreyReference,
};
pub use error::{Error, Result};
pub use frame::{canonical_sign, oriented_bounds, Frame};
pub use generate::{generate, GeneratedShape};
pub use profile::{
    classify, classify_outline, convex_hull, is_circular, polygon_area, section_from_raw, Profile2D,
    ProfileSection,
};
pub use proximity::{contains, gap, overlaps, penetration, separation};
pub use reduction::reduce_shape;
pub use tiling::{tile_modules, FootprintGrid, ModulePlacement, TilingOptions};
