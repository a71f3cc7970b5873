// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation tolerances (meters)

use crate::error::{Result, ValidateError};
use serde::{Deserialize, Serialize};

/// Validator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Largest box gap accepted for an asserted adjacency
    pub adjacency_tolerance: f64,
    /// Largest box gap accepted for an asserted connection
    pub connection_tolerance: f64,
    /// Growth of the outer box when checking containment
    pub containment_tolerance: f64,
    /// Penetration on every axis beyond which two members collide
    pub overlap_tolerance: f64,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            adjacency_tolerance: 0.01,
            connection_tolerance: 0.01,
            containment_tolerance: 0.01,
            overlap_tolerance: 0.005,
        }
    }
}

impl ValidatorOptions {
    /// Millimeter tolerances
    pub fn strict() -> Self {
        Self {
            adjacency_tolerance: 0.001,
            connection_tolerance: 0.001,
            containment_tolerance: 0.001,
            overlap_tolerance: 0.0005,
        }
    }

    /// Tolerances for survey-grade input
    pub fn lenient() -> Self {
        Self {
            adjacency_tolerance: 0.05,
            connection_tolerance: 0.05,
            containment_tolerance: 0.05,
            overlap_tolerance: 0.02,
        }
    }

    /// Set the adjacency tolerance
    pub fn with_adjacency_tolerance(mut self, tolerance: f64) -> Self {
        self.adjacency_tolerance = tolerance;
        self
    }

    /// Set the overlap tolerance
    pub fn with_overlap_tolerance(mut self, tolerance: f64) -> Self {
        self.overlap_tolerance = tolerance;
        self
    }

    /// Check every tolerance is finite and non-negative
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("adjacency", self.adjacency_tolerance),
            ("connection", self.connection_tolerance),
            ("containment", self.containment_tolerance),
            ("overlap", self.overlap_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidateError::options(format!(
                    "{} tolerance must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
