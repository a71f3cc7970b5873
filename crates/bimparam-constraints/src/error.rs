// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for constraint evaluation

use bimparam_model::Interval;
use thiserror::Error;

/// Result type alias for constraint evaluation
pub type Result<T> = std::result::Result<T, ConstraintError>;

/// Constraint evaluation errors
///
/// Raised before a predicate runs; the predicate itself never fails on
/// bound, in-domain input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// Parameter value outside the declared domain (or not integral)
    #[error("{slot}.{parameter} = {value} outside domain {domain}")]
    DomainViolation {
        slot: String,
        parameter: String,
        value: f64,
        domain: Interval,
    },

    /// Parameter not declared by the slot's template
    #[error("{slot} has no parameter '{parameter}'")]
    UnknownParameter { slot: String, parameter: String },

    /// Constraint refers to an instance that is not bound
    #[error("No instance bound to slot '{0}'")]
    UnboundSlot(String),
}
