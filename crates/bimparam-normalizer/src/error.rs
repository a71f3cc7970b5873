// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Warnings and errors raised during normalization

use bimparam_model::{ElementId, RelationKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for normalization
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Non-fatal notices; the batch continues and affected records are kept
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum NormalizerWarning {
    /// Type tag and name did not resolve to a category
    #[error("Element {id}: type '{type_tag}' has no semantic category")]
    UnclassifiedElement { id: ElementId, type_tag: String },

    /// Identifier seen more than once; the last record is authoritative
    #[error("Element {id} appears {occurrences} times, keeping the last record")]
    DuplicateElement { id: ElementId, occurrences: usize },

    /// Relation targets an identifier absent from the batch
    #[error("Element {id}: {kind} relation to unknown element {target}")]
    DanglingRelation {
        id: ElementId,
        kind: RelationKind,
        target: ElementId,
    },

    /// Shape could not be reduced; the element keeps no descriptor
    #[error("Element {id}: invalid geometry: {message}")]
    InvalidGeometry { id: ElementId, message: String },
}

impl NormalizerWarning {
    /// Element the notice is about
    pub fn element(&self) -> &ElementId {
        match self {
            NormalizerWarning::UnclassifiedElement { id, .. }
            | NormalizerWarning::DuplicateElement { id, .. }
            | NormalizerWarning::DanglingRelation { id, .. }
            | NormalizerWarning::InvalidGeometry { id, .. } => id,
        }
    }
}

/// Fatal normalization errors (bad configuration, not bad records)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// Options out of range
    #[error("Invalid normalizer options: {0}")]
    InvalidOptions(String),

    /// Source reported an unusable unit scale
    #[error("Invalid unit scale {0}")]
    InvalidUnitScale(f64),
}

impl NormalizeError {
    /// Create an invalid options error
    pub fn options(msg: impl Into<String>) -> Self {
        NormalizeError::InvalidOptions(msg.into())
    }
}
