// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for model-level invariants

use crate::{Interval, TemplateId};
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised when a model value breaks one of its invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Template schema or rule is inconsistent
    #[error("Schema violation in template {template}: {reason}")]
    SchemaViolation { template: TemplateId, reason: String },

    /// Parameter value lies outside its declared domain
    #[error("Parameter '{parameter}' = {value} outside domain {domain}")]
    DomainViolation {
        parameter: String,
        value: f64,
        domain: Interval,
    },

    /// Parameter name not declared in the schema
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Schema parameter without a value
    #[error("Missing value for parameter '{0}'")]
    MissingParameter(String),

    /// Two assembly members share a key
    #[error("Assembly already has a member with key '{0}'")]
    DuplicateMember(String),

    /// Key does not name an assembly member
    #[error("Assembly has no member with key '{0}'")]
    UnknownMember(String),

    /// Certificate was issued for different member revisions
    #[error("Certificate does not match assembly '{0}'")]
    CertificateMismatch(String),
}

impl ModelError {
    /// Create a schema violation error
    pub fn schema(template: &TemplateId, reason: impl Into<String>) -> Self {
        ModelError::SchemaViolation {
            template: template.clone(),
            reason: reason.into(),
        }
    }

    /// Create a domain violation error
    pub fn domain(parameter: impl Into<String>, value: f64, domain: Interval) -> Self {
        ModelError::DomainViolation {
            parameter: parameter.into(),
            value,
            domain,
        }
    }
}
