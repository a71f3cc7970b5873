// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for reparametrization

use bimparam_constraints::ConstraintError;
use bimparam_model::{Interval, ModelError, ParameterValues};
use std::fmt;
use thiserror::Error;

/// Result type alias for solving
pub type Result<T> = std::result::Result<T, SolveError>;

/// Declared domain a solution would have to leave
#[derive(Debug, Clone, PartialEq)]
pub struct BoundViolation {
    pub parameter: String,
    pub domain: Interval,
    /// Range the constraints demand, when known
    pub required: Option<Interval>,
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.required {
            Some(required) => write!(
                f,
                "{} requires {} outside domain {}",
                self.parameter, required, self.domain
            ),
            None => write!(f, "{} at edge of domain {}", self.parameter, self.domain),
        }
    }
}

/// Why no instance could be produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfeasibleReport {
    /// Constraints that could not be satisfied, by name
    pub violated_constraints: Vec<String>,
    /// Domains that block a solution
    pub violated_bounds: Vec<BoundViolation>,
    /// Best assignment found, if the search got that far
    pub best: Option<ParameterValues>,
}

impl fmt::Display for InfeasibleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "violated constraints [{}]", self.violated_constraints.join(", "))?;
        if !self.violated_bounds.is_empty() {
            let bounds: Vec<String> = self.violated_bounds.iter().map(|b| b.to_string()).collect();
            write!(f, "; bounds [{}]", bounds.join("; "))?;
        }
        Ok(())
    }
}

/// Solve errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// No assignment satisfies the constraints within the domains
    #[error("Infeasible: {0}")]
    Infeasible(InfeasibleReport),

    #[error("Solve cancelled")]
    Cancelled,

    #[error("{slot}.{parameter} = {value} outside domain {domain}")]
    DomainViolation {
        slot: String,
        parameter: String,
        value: f64,
        domain: Interval,
    },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A constraint names an instance that is neither solved nor in context
    #[error("Constraint refers to unbound instance '{0}'")]
    UnboundInstance(String),

    #[error("Invalid solver options: {0}")]
    InvalidOptions(String),

    #[error("Template error: {0}")]
    Model(#[from] ModelError),

    #[error("Generation error: {0}")]
    Geometry(#[from] bimparam_geometry::Error),
}

impl From<ConstraintError> for SolveError {
    fn from(e: ConstraintError) -> Self {
        match e {
            ConstraintError::DomainViolation {
                slot,
                parameter,
                value,
                domain,
            } => SolveError::DomainViolation {
                slot,
                parameter,
                value,
                domain,
            },
            ConstraintError::UnknownParameter { slot, parameter } => {
                SolveError::UnknownParameter(format!("{}.{}", slot, parameter))
            }
            ConstraintError::UnboundSlot(slot) => SolveError::UnboundInstance(slot),
        }
    }
}
