// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for pattern recognition

use thiserror::Error;

/// Result type alias for recognition
pub type Result<T> = std::result::Result<T, RecognizeError>;

/// Recognition errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecognizeError {
    /// Options out of range
    #[error("Invalid recognizer options: {0}")]
    InvalidOptions(String),
}

impl RecognizeError {
    /// Create an invalid options error
    pub fn options(msg: impl Into<String>) -> Self {
        RecognizeError::InvalidOptions(msg.into())
    }
}
