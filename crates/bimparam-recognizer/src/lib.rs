// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam recognizer
//!
//! Finds families of recurring elements and turns each family into a
//! parametric template.
//!
//! ## Overview
//!
//! - **Signatures**: profile kind and key text properties form the
//!   categorical part; principal extents, section samples, fill ratio and
//!   key numeric properties the numeric part
//! - **Clustering**: centroid-linkage agglomeration per category, merging
//!   while the centroid distance stays within the similarity threshold
//! - **Synthesis**: invariant features become constants, varying features
//!   become parameters with observed range, expanded domain and default
//!
//! ## Example
//!
//! ```rust,ignore
//! use bimparam_recognizer::{Recognizer, RecognizerOptions};
//!
//! let outcome = Recognizer::new(RecognizerOptions::default()).recognize(&report.elements)?;
//! for template in &outcome.templates {
//!     println!("{}: {} parameters", template.id, template.schema.len());
//! }
//! ```

mod cluster;
mod error;
mod options;
mod recognizer;
mod signature;
mod synthesis;

pub use cluster::agglomerate;
pub use error::{RecognizeError, Result};
pub use options::RecognizerOptions;
pub use recognizer::{RecognitionOutcome, Recognizer, Unclustered, UnclusteredReason};
pub use signature::{KeyValue, Signature};
pub use synthesis::{parameters_of, synthesize, DIAMETER};
