// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BimParam Model - Shared types and trait seams
//!
//! This crate provides the core vocabulary shared by every stage of the
//! decomposition pipeline: raw and normalized building elements, parametric
//! templates, template instances and assemblies. It also defines the traits
//! at the boundaries of the core, so that parsers, stores and exporters can
//! be swapped without touching the algorithms.
//!
//! # Architecture
//!
//! - [`ElementSource`] - Entry point for raw element records (parser side)
//! - [`TemplateLookup`] - Read access to stored templates by reference
//! - [`ParametricTemplate`] - A recognized family with its parameter schema
//! - [`TemplateInstance`] - A concrete, solved instance of a template
//! - [`Assembly`] - Instances plus asserted relations, optionally certified
//!
//! # Example
//!
//! ```ignore
//! use bimparam_model::{ElementSource, RawElement, VecSource};
//!
//! let source = VecSource::new(vec![RawElement::new("C1", "IfcColumn")]);
//! for element in source.elements() {
//!     println!("{} ({})", element.id, element.type_tag);
//! }
//! ```

pub mod assembly;
pub mod element;
pub mod error;
pub mod geometry;
pub mod instance;
pub mod properties;
pub mod spatial;
pub mod template;
pub mod traits;
pub mod types;

// Re-export all public types
pub use assembly::*;
pub use element::*;
pub use error::*;
pub use geometry::*;
pub use instance::*;
pub use properties::*;
pub use spatial::*;
pub use template::*;
pub use traits::*;
pub use types::*;
