// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solved template instances

use crate::{GeometricDescriptor, ParameterValues, PropertyMap, TemplateRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance identifier: caller-chosen key plus revision
///
/// Re-solving an instance keeps the key and bumps the revision.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub key: String,
    pub revision: u32,
}

impl InstanceId {
    /// First revision of a key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            revision: 1,
        }
    }

    /// Next revision of the same key
    pub fn next(&self) -> Self {
        Self {
            key: self.key.clone(),
            revision: self.revision + 1,
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@r{}", self.key, self.revision)
    }
}

/// Where a generated instance is placed
///
/// `origin` is the start point of the principal axis (base center of a
/// column, start of a beam).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Placement {
    pub origin: [f64; 3],
}

impl Placement {
    /// Placement at a point
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self { origin: [x, y, z] }
    }
}

/// Concrete, immutable instance of a template version
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateInstance {
    pub id: InstanceId,
    pub template: TemplateRef,
    /// Complete parameter assignment inside the template domains
    pub parameters: ParameterValues,
    pub placement: Placement,
    /// Geometry produced by the generative rule
    pub descriptor: GeometricDescriptor,
    /// Properties produced by the generative rule
    pub properties: PropertyMap,
    /// Instance this one replaces, if it came from re-solving
    pub supersedes: Option<InstanceId>,
}

impl TemplateInstance {
    /// Caller-chosen key
    pub fn key(&self) -> &str {
        &self.id.key
    }

    /// Parameter value by name
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_revisions() {
        let id = InstanceId::new("col-a");
        assert_eq!(id.revision, 1);
        let next = id.next();
        assert_eq!(next.key, "col-a");
        assert_eq!(next.revision, 2);
        assert_eq!(next.to_string(), "col-a@r2");
        assert!(id < next);
    }
}
