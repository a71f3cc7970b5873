// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam solver
//!
//! Reparametrization of templates under constraints.
//!
//! ## Overview
//!
//! A [`SolveRequest`] names a template version, the key of the new
//! instance, the constraints to honor, optional seed values, a placement
//! and any already solved instances the constraints relate to. The
//! [`Reparametrizer`] picks parameter values inside the declared domains,
//! generates the geometry and returns an immutable instance, or reports
//! which constraints and bounds make the request infeasible.
//!
//! ```rust,ignore
//! use bimparam_solver::{Reparametrizer, SolveRequest};
//!
//! let request = SolveRequest::new(template, "c1").with_constraints(constraints);
//! let instance = Reparametrizer::default().solve(&request)?;
//! println!("height = {:?}", instance.parameter("height"));
//! ```

mod error;
mod options;
mod request;
mod solver;

pub use error::{BoundViolation, InfeasibleReport, Result, SolveError};
pub use options::{CancelFlag, SolverOptions};
pub use request::{ContextInstance, SolveRequest};
pub use solver::Reparametrizer;
