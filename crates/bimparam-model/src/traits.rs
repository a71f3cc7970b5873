// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traits at the boundaries of the core
//!
//! Parsers feed the pipeline through [`ElementSource`]; stores expose stored
//! templates through [`TemplateLookup`].

use crate::{ParametricTemplate, RawElement, TemplateRef};
use std::sync::Arc;

/// Progress callback type for long-running stages
pub type ProgressCallback = Box<dyn Fn(&str, f32) + Send>;

/// Finite stream of raw element records
///
/// Implementations wrap a parsed building model. No ordering is assumed and
/// identifiers may repeat; the normalizer treats the later record as
/// authoritative.
///
/// # Example
///
/// ```ignore
/// use bimparam_model::{ElementSource, RawElement, VecSource};
///
/// let source = VecSource::new(vec![RawElement::new("C1", "IfcColumn")])
///     .with_unit_scale(0.001);
/// assert_eq!(source.elements().count(), 1);
/// ```
pub trait ElementSource: Send + Sync {
    /// Get unit scale factor (file units to meters)
    ///
    /// Common values:
    /// - 1.0 for meters
    /// - 0.001 for millimeters
    /// - 0.3048 for feet
    fn unit_scale(&self) -> f64 {
        1.0
    }

    /// Iterate over every raw record
    ///
    /// # Returns
    /// A fresh iterator; calling it twice yields the same records
    fn elements(&self) -> Box<dyn Iterator<Item = RawElement> + Send + '_>;
}

/// In-memory element source
#[derive(Clone, Debug)]
pub struct VecSource {
    elements: Vec<RawElement>,
    unit_scale: f64,
}

impl VecSource {
    /// Create a source in meters
    pub fn new(elements: Vec<RawElement>) -> Self {
        Self {
            elements,
            unit_scale: 1.0,
        }
    }

    /// Set the unit scale
    pub fn with_unit_scale(mut self, unit_scale: f64) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the source is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementSource for VecSource {
    fn unit_scale(&self) -> f64 {
        self.unit_scale
    }

    fn elements(&self) -> Box<dyn Iterator<Item = RawElement> + Send + '_> {
        Box::new(self.elements.iter().cloned())
    }
}

/// Read access to stored template versions
pub trait TemplateLookup: Send + Sync {
    /// Resolve a template reference
    ///
    /// # Arguments
    /// * `reference` - Template identity and version
    ///
    /// # Returns
    /// The stored template, or `None` if the identity or version is unknown
    fn lookup(&self, reference: &TemplateRef) -> Option<Arc<ParametricTemplate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source() {
        let source = VecSource::new(vec![
            RawElement::new("C1", "IfcColumn"),
            RawElement::new("B1", "IfcBeam"),
        ])
        .with_unit_scale(0.001);
        assert_eq!(source.unit_scale(), 0.001);
        assert_eq!(source.elements().count(), 2);
        // Restartable
        assert_eq!(source.elements().count(), 2);
    }
}
