// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the template library

use bimparam_model::{ModelError, SemanticCategory, TemplateId, TemplateRef};
use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Library errors
///
/// `Corrupt` and `Serialization` are fatal for the snapshot being loaded or
/// written; every other variant concerns a single request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LibraryError {
    /// Template does not satisfy its schema invariants
    #[error("Schema violation: {0}")]
    SchemaViolation(#[source] ModelError),

    #[error("Template not found: {0}")]
    NotFound(TemplateId),

    #[error("Template version not found: {0}")]
    VersionNotFound(TemplateRef),

    /// Compare-and-swap put lost against a concurrent writer
    #[error("Version conflict on {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        id: TemplateId,
        expected: u32,
        actual: u32,
    },

    /// A template identity keeps its category across versions
    #[error("Template {id} cannot change category from {from} to {to}")]
    CategoryChanged {
        id: TemplateId,
        from: SemanticCategory,
        to: SemanticCategory,
    },

    /// Snapshot content is inconsistent
    #[error("Corrupt library snapshot during {operation} at {identity}@v{version}: {message}")]
    Corrupt {
        identity: String,
        version: u32,
        operation: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LibraryError {
    /// Create a corruption error
    pub fn corrupt(
        identity: impl Into<String>,
        version: u32,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        LibraryError::Corrupt {
            identity: identity.into(),
            version,
            operation,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(e: serde_json::Error) -> Self {
        LibraryError::Serialization(e.to_string())
    }
}
