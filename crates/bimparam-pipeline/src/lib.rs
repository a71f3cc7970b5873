// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam pipeline
//!
//! End-to-end reparametrization: raw BIM records in, certified assemblies
//! of parametric instances out.
//!
//! ## Overview
//!
//! 1. **Ingest**: normalize records, recognize recurring families and store
//!    them as versioned templates
//! 2. **Reparametrize**: solve new instances under constraints
//! 3. **Certify**: validate assemblies of instances
//! 4. **Export**: hand certified assemblies to an exporter
//!
//! The library store is passed in explicitly and handed back on close.
//!
//! ```rust,ignore
//! use bimparam_library::LibraryStore;
//! use bimparam_pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::open(PipelineConfig::default(), LibraryStore::new())?;
//! let report = pipeline.ingest(&source)?;
//! let instance = pipeline.reparametrize(&pipeline.request("column-001", "c1")?)?;
//! let snapshot = pipeline.flush()?;
//! ```

mod config;
mod error;
mod pipeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{IngestReport, Pipeline};

