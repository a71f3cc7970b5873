// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for geometric reduction and generation

use thiserror::Error;

/// Geometry result type
pub type Result<T> = std::result::Result<T, Error>;

/// Geometry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Non-finite coordinate or non-positive extent in the input
    #[error("Invalid geometry: {0}")]
    InvalidInput(String),

    /// Shape collapses to a point or a line
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    /// Profile processing error
    #[error("Profile error: {0}")]
    Profile(String),

    /// Generative rule reads a parameter without a value
    #[error("No value for parameter '{0}'")]
    UnboundParameter(String),

    /// Invalid tiling options or footprint
    #[error("Tiling error: {0}")]
    Tiling(String),

    /// Element groups share no storey to align on
    #[error("Alignment error: {0}")]
    Alignment(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a degenerate geometry error
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::Degenerate(msg.into())
    }

    /// Create a profile error
    pub fn profile(msg: impl Into<String>) -> Self {
        Error::Profile(msg.into())
    }

    /// Create a tiling error
    pub fn tiling(msg: impl Into<String>) -> Self {
        Error::Tiling(msg.into())
    }

    /// Create an alignment error
    pub fn alignment(msg: impl Into<String>) -> Self {
        Error::Alignment(msg.into())
    }
}
