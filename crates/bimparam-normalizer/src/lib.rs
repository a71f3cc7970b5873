// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BimParam Normalizer - Raw element records to canonical attributed shapes
//!
//! Every record resolves to exactly one semantic category through a
//! [`CategoryTable`]; unresolved records are kept under `unknown` and
//! reported. Geometry is reduced with the fixed reduction of
//! `bimparam-geometry`, so elements of the same physical type map to
//! comparable descriptors whatever their modeling convention.
//!
//! [`UsageSummary`] reads the space usage of normalized elements from
//! their names and counts it per storey.
//!
//! # Example
//!
//! ```ignore
//! use bimparam_model::{RawElement, VecSource};
//! use bimparam_normalizer::Normalizer;
//!
//! let source = VecSource::new(vec![RawElement::new("C1", "IfcColumn")]);
//! let report = Normalizer::default().normalize(&source)?;
//! for warning in &report.warnings {
//!     eprintln!("{}", warning);
//! }
//! ```

mod category;
mod error;
mod normalizer;
mod usage;

pub use category::CategoryTable;
pub use error::{NormalizeError, NormalizerWarning, Result};
pub use normalizer::{NormalizationReport, Normalizer, NormalizerOptions};
pub use usage::{classify_usage, is_spatial, StoreyUsage, UsageCategory, UsageDetail, UsageSummary};
