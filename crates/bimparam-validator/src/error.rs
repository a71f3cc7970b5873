// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for validation output

use thiserror::Error;

/// Result type alias for manifest and export operations
pub type Result<T> = std::result::Result<T, ValidateError>;

/// Errors outside the validation verdict itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidateError {
    #[error("Invalid validator options: {0}")]
    InvalidOptions(String),

    /// Export needs a certificate matching the current members
    #[error("Assembly '{0}' is not certified")]
    Uncertified(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl ValidateError {
    pub fn options<S: Into<String>>(msg: S) -> Self {
        ValidateError::InvalidOptions(msg.into())
    }

    pub fn export<S: Into<String>>(msg: S) -> Self {
        ValidateError::Export(msg.into())
    }
}

impl From<serde_json::Error> for ValidateError {
    fn from(e: serde_json::Error) -> Self {
        ValidateError::Serialization(e.to_string())
    }
}
