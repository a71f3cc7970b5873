// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam validator
//!
//! All-or-nothing validation of assemblies of template instances.
//!
//! ## Overview
//!
//! The [`AssemblyValidator`] checks asserted relations against member
//! bounding boxes, evaluates the constraints that read members and looks
//! for collisions between members not marked compatible. It either issues
//! a [`Certificate`](bimparam_model::Certificate) or returns a
//! [`ValidationReport`] with every violation. Certified assemblies can be
//! bundled with a [`Manifest`] and handed to an [`AssemblyExporter`].
//!
//! ```rust,ignore
//! use bimparam_validator::{AssemblyValidator, ExportBundle, MemoryExporter, AssemblyExporter};
//!
//! let certificate = AssemblyValidator::default().validate(&assembly, &constraints, &store)?;
//! assembly.attach_certificate(certificate)?;
//! MemoryExporter::new().export(&ExportBundle::new(&assembly)?)?;
//! ```

mod error;
mod export;
mod manifest;
mod options;
mod report;
mod validator;

pub use error::{Result, ValidateError};
pub use export::{AssemblyExporter, ExportBundle, MemoryExporter};
pub use manifest::{Manifest, ManifestEntry};
pub use options::ValidatorOptions;
pub use report::{ValidationReport, Violation};
pub use validator::AssemblyValidator;
