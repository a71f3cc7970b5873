// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation findings

use bimparam_model::AssertedRelation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One reason an assembly was rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Asserted relation not borne out by the geometry
    RelationMismatch {
        relation: AssertedRelation,
        detail: String,
    },
    /// Constraint over members that does not hold
    ConstraintViolation {
        constraint: String,
        instances: Vec<String>,
        /// Set when the constraint could not be evaluated at all
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// Two members share space without being marked compatible
    CollisionConflict {
        a: String,
        b: String,
        penetration: [f64; 3],
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RelationMismatch { relation, detail } => write!(
                f,
                "{} '{}' -> '{}': {}",
                relation.kind, relation.from, relation.to, detail
            ),
            Violation::ConstraintViolation {
                constraint,
                instances,
                detail,
            } => {
                write!(f, "constraint '{}' on [{}]", constraint, instances.join(", "))?;
                match detail {
                    Some(detail) => write!(f, ": {}", detail),
                    None => f.write_str(" does not hold"),
                }
            }
            Violation::CollisionConflict { a, b, penetration } => write!(
                f,
                "'{}' and '{}' overlap by [{:.3}, {:.3}, {:.3}]",
                a, b, penetration[0], penetration[1], penetration[2]
            ),
        }
    }
}

/// Every violation found in one validation run, in check order
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("Assembly '{assembly}' failed validation with {} violation(s)", .violations.len())]
pub struct ValidationReport {
    pub assembly: String,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Relation mismatches only
    pub fn relation_mismatches(&self) -> impl Iterator<Item = &Violation> {
        self.iter()
            .filter(|v| matches!(v, Violation::RelationMismatch { .. }))
    }

    /// Constraint violations only
    pub fn constraint_violations(&self) -> impl Iterator<Item = &Violation> {
        self.iter()
            .filter(|v| matches!(v, Violation::ConstraintViolation { .. }))
    }

    /// Collisions only
    pub fn collisions(&self) -> impl Iterator<Item = &Violation> {
        self.iter()
            .filter(|v| matches!(v, Violation::CollisionConflict { .. }))
    }
}
