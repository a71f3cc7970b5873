// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline errors

use bimparam_library::LibraryError;
use bimparam_model::ModelError;
use bimparam_normalizer::NormalizeError;
use bimparam_recognizer::RecognizeError;
use bimparam_solver::SolveError;
use bimparam_validator::{ValidateError, ValidationReport};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Any failure surfaced by a pipeline stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Recognize(#[from] RecognizeError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Rejected(#[from] ValidationReport),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Geometry(#[from] bimparam_geometry::Error),
}

impl PipelineError {
    /// Check if the library can no longer be trusted
    ///
    /// Only a corrupt or unreadable library is fatal; every other error
    /// leaves the pipeline usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Library(LibraryError::Corrupt { .. })
                | PipelineError::Library(LibraryError::Serialization(_))
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Config(e.to_string())
    }
}
