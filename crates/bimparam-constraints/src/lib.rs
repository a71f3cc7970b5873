// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # bimparam constraints
//!
//! Declarative constraints over template instances.
//!
//! Constraints are plain data: an [`Expr`] tree over parameters, derived
//! geometric quantities and properties of bound instances, compared or
//! combined by a [`Predicate`]. Instances are addressed by key through
//! [`Bindings`]. Before a predicate runs, every parameter it reads is
//! checked against its template's declared domain.
//!
//! ```rust,ignore
//! use bimparam_constraints::{CompareOp, ConstraintSet, ConstraintSpec, Expr, Predicate};
//!
//! let constraints = ConstraintSet::new().with(ConstraintSpec::new(
//!     "storey-height",
//!     Predicate::equals(Expr::param("c1", "height"), 4.5, 1e-9),
//! ));
//! ```

mod bindings;
mod constraint;
mod error;
mod expr;
mod predicate;

pub use bindings::{Bindings, Slot};
pub use constraint::{ConstraintSet, ConstraintSpec};
pub use error::{ConstraintError, Result};
pub use expr::{Axis, DerivedQuantity, Expr};
pub use predicate::{CompareOp, ParameterBound, Predicate};
