// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boolean predicates over expressions and properties

use crate::bindings::Bindings;
use crate::error::Result;
use crate::expr::{DerivedQuantity, Expr};
use bimparam_model::{Interval, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Violation reported for a predicate that is false at zero distance
/// (strict comparisons on the boundary, boolean mismatches)
const BOUNDARY_VIOLATION: f64 = 1e-9;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CompareOp {
    /// Operator with swapped operands (`a < b` is `b > a`)
    pub fn flipped(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Ge => CompareOp::Le,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Eq | CompareOp::Ne => self,
        }
    }

    /// Compare with a tolerance that loosens the operator; NaN is never
    /// comparable
    pub fn apply(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs + tolerance,
            CompareOp::Le => lhs <= rhs + tolerance,
            CompareOp::Eq => (lhs - rhs).abs() <= tolerance,
            CompareOp::Ge => lhs >= rhs - tolerance,
            CompareOp::Gt => lhs > rhs - tolerance,
            CompareOp::Ne => (lhs - rhs).abs() > tolerance,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
            CompareOp::Ne => "!=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Bound on one parameter of one slot
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBound {
    pub slot: String,
    pub parameter: String,
    pub interval: Interval,
}

/// Constraint predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `lhs op rhs`, loosened by `tolerance`
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
        #[serde(default)]
        tolerance: f64,
    },
    /// `|value - target| <= tolerance` (alignment)
    Within {
        value: Expr,
        target: Expr,
        tolerance: f64,
    },
    /// Property `name` is present on both slots with equal values
    PropertyMatch { a: String, b: String, name: String },
    /// Property `name` of `slot` equals a value
    PropertyEquals {
        slot: String,
        name: String,
        value: PropertyValue,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Exact comparison
    pub fn compare(lhs: impl Into<Expr>, op: CompareOp, rhs: impl Into<Expr>) -> Self {
        Predicate::Compare {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
            tolerance: 0.0,
        }
    }

    /// `lhs == rhs` within a tolerance
    pub fn equals(lhs: impl Into<Expr>, rhs: impl Into<Expr>, tolerance: f64) -> Self {
        Predicate::Compare {
            lhs: lhs.into(),
            op: CompareOp::Eq,
            rhs: rhs.into(),
            tolerance,
        }
    }

    /// Alignment within a tolerance
    pub fn within(value: impl Into<Expr>, target: impl Into<Expr>, tolerance: f64) -> Self {
        Predicate::Within {
            value: value.into(),
            target: target.into(),
            tolerance,
        }
    }

    /// Matching property between two slots
    pub fn property_match(a: impl Into<String>, b: impl Into<String>, name: impl Into<String>) -> Self {
        Predicate::PropertyMatch {
            a: a.into(),
            b: b.into(),
            name: name.into(),
        }
    }

    /// Property equal to a value
    pub fn property_equals(
        slot: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Predicate::PropertyEquals {
            slot: slot.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Evaluate without domain checks
    pub fn holds(&self, bindings: &Bindings<'_>) -> Result<bool> {
        Ok(match self {
            Predicate::Compare {
                lhs,
                op,
                rhs,
                tolerance,
            } => op.apply(lhs.eval(bindings)?, rhs.eval(bindings)?, *tolerance),
            Predicate::Within {
                value,
                target,
                tolerance,
            } => (value.eval(bindings)? - target.eval(bindings)?).abs() <= *tolerance,
            Predicate::PropertyMatch { a, b, name } => {
                let left = bindings.get(a)?.properties.get(name);
                let right = bindings.get(b)?.properties.get(name);
                matches!((left, right), (Some(l), Some(r)) if l == r)
            }
            Predicate::PropertyEquals { slot, name, value } => {
                bindings.get(slot)?.properties.get(name) == Some(value)
            }
            Predicate::All(parts) => {
                for part in parts {
                    if !part.holds(bindings)? {
                        return Ok(false);
                    }
                }
                true
            }
            Predicate::Any(parts) => {
                for part in parts {
                    if part.holds(bindings)? {
                        return Ok(true);
                    }
                }
                false
            }
            Predicate::Not(inner) => !inner.holds(bindings)?,
        })
    }

    /// Non-negative violation magnitude, zero when the predicate holds
    ///
    /// Unevaluable comparisons (NaN operands) are infinitely violated.
    pub fn violation(&self, bindings: &Bindings<'_>) -> Result<f64> {
        let raw = match self {
            Predicate::Compare {
                lhs,
                op,
                rhs,
                tolerance,
            } => {
                let l = lhs.eval(bindings)?;
                let r = rhs.eval(bindings)?;
                if l.is_nan() || r.is_nan() {
                    return Ok(f64::INFINITY);
                }
                let t = *tolerance;
                match op {
                    CompareOp::Lt | CompareOp::Le => (l - r - t).max(0.0),
                    CompareOp::Ge | CompareOp::Gt => (r - t - l).max(0.0),
                    CompareOp::Eq => ((l - r).abs() - t).max(0.0),
                    CompareOp::Ne => (t - (l - r).abs()).max(0.0),
                }
            }
            Predicate::Within {
                value,
                target,
                tolerance,
            } => {
                let d = (value.eval(bindings)? - target.eval(bindings)?).abs();
                if d.is_nan() {
                    return Ok(f64::INFINITY);
                }
                (d - tolerance).max(0.0)
            }
            Predicate::All(parts) => {
                let mut total = 0.0;
                for part in parts {
                    total += part.violation(bindings)?;
                }
                total
            }
            Predicate::Any(parts) => {
                let mut best = if parts.is_empty() { 1.0 } else { f64::INFINITY };
                for part in parts {
                    best = best.min(part.violation(bindings)?);
                }
                best
            }
            Predicate::PropertyMatch { .. }
            | Predicate::PropertyEquals { .. }
            | Predicate::Not(_) => {
                if self.holds(bindings)? {
                    0.0
                } else {
                    1.0
                }
            }
        };
        if raw == 0.0 && !self.holds(bindings)? {
            return Ok(BOUNDARY_VIOLATION);
        }
        Ok(raw)
    }

    /// Interval bounds on single parameters, if that is all the predicate says
    ///
    /// Recognizes comparisons and alignments between one parameter and a
    /// constant expression, and conjunctions of those. Returns `None` for
    /// anything else (including `!=`).
    pub fn interval_bounds(&self) -> Option<Vec<ParameterBound>> {
        match self {
            Predicate::Compare {
                lhs,
                op,
                rhs,
                tolerance,
            } => {
                let (slot, parameter, op, c) = match (lhs, rhs.constant_value()) {
                    (Expr::Param { slot, name }, Some(c)) => (slot, name, *op, c),
                    _ => match (rhs, lhs.constant_value()) {
                        (Expr::Param { slot, name }, Some(c)) => (slot, name, op.flipped(), c),
                        _ => return None,
                    },
                };
                if !c.is_finite() {
                    return None;
                }
                let t = *tolerance;
                let interval = match op {
                    CompareOp::Lt | CompareOp::Le => Interval::new(f64::NEG_INFINITY, c + t),
                    CompareOp::Ge | CompareOp::Gt => Interval::new(c - t, f64::INFINITY),
                    CompareOp::Eq => Interval::new(c - t, c + t),
                    CompareOp::Ne => return None,
                };
                Some(vec![ParameterBound {
                    slot: slot.clone(),
                    parameter: parameter.clone(),
                    interval,
                }])
            }
            Predicate::Within {
                value: Expr::Param { slot, name },
                target,
                tolerance,
            } => {
                let c = target.constant_value().filter(|c| c.is_finite())?;
                Some(vec![ParameterBound {
                    slot: slot.clone(),
                    parameter: name.clone(),
                    interval: Interval::new(c - tolerance, c + tolerance),
                }])
            }
            Predicate::All(parts) => {
                let mut bounds = Vec::new();
                for part in parts {
                    bounds.extend(part.interval_bounds()?);
                }
                Some(bounds)
            }
            _ => None,
        }
    }

    /// Collect `(slot, parameter)` pairs the predicate reads
    pub fn collect_parameters<'a>(&'a self, out: &mut BTreeSet<(&'a str, &'a str)>) {
        match self {
            Predicate::Compare { lhs, rhs, .. } => {
                lhs.collect_parameters(out);
                rhs.collect_parameters(out);
            }
            Predicate::Within { value, target, .. } => {
                value.collect_parameters(out);
                target.collect_parameters(out);
            }
            Predicate::PropertyMatch { .. } | Predicate::PropertyEquals { .. } => {}
            Predicate::All(parts) | Predicate::Any(parts) => {
                for part in parts {
                    part.collect_parameters(out);
                }
            }
            Predicate::Not(inner) => inner.collect_parameters(out),
        }
    }

    /// Collect derived geometric quantities the predicate reads
    pub fn collect_derived<'a>(&'a self, out: &mut Vec<(&'a str, DerivedQuantity)>) {
        match self {
            Predicate::Compare { lhs, rhs, .. } => {
                lhs.collect_derived(out);
                rhs.collect_derived(out);
            }
            Predicate::Within { value, target, .. } => {
                value.collect_derived(out);
                target.collect_derived(out);
            }
            Predicate::PropertyMatch { .. } | Predicate::PropertyEquals { .. } => {}
            Predicate::All(parts) | Predicate::Any(parts) => {
                for part in parts {
                    part.collect_derived(out);
                }
            }
            Predicate::Not(inner) => inner.collect_derived(out),
        }
    }

    /// Collect every slot the predicate reads
    pub fn collect_slots<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Compare { lhs, rhs, .. } => {
                lhs.collect_slots(out);
                rhs.collect_slots(out);
            }
            Predicate::Within { value, target, .. } => {
                value.collect_slots(out);
                target.collect_slots(out);
            }
            Predicate::PropertyMatch { a, b, .. } => {
                out.insert(a.as_str());
                out.insert(b.as_str());
            }
            Predicate::PropertyEquals { slot, .. } => {
                out.insert(slot.as_str());
            }
            Predicate::All(parts) | Predicate::Any(parts) => {
                for part in parts {
                    part.collect_slots(out);
                }
            }
            Predicate::Not(inner) => inner.collect_slots(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn height(slot: &str) -> Expr {
        Expr::param(slot, "height")
    }

    #[test]
    fn test_tolerant_comparisons() {
        assert!(CompareOp::Le.apply(3.0, 3.0, 0.0));
        assert!(!CompareOp::Lt.apply(3.0, 3.0, 0.0));
        assert!(CompareOp::Eq.apply(3.0, 3.004, 0.005));
        assert!(CompareOp::Ne.apply(3.0, 3.1, 0.005));
        assert!(!CompareOp::Ge.apply(f64::NAN, 0.0, 1.0));
        assert!(!CompareOp::Ne.apply(f64::NAN, 0.0, 1.0));
    }

    #[test]
    fn test_interval_bounds() {
        let p = Predicate::equals(height("c1"), 4.5, 0.0);
        assert_eq!(
            p.interval_bounds(),
            Some(vec![ParameterBound {
                slot: "c1".to_string(),
                parameter: "height".to_string(),
                interval: Interval::new(4.5, 4.5),
            }])
        );

        // Constant on the left flips the operator
        let p = Predicate::compare(Expr::constant(2.0) + 1.0, CompareOp::Le, height("c1"));
        let bounds = p.interval_bounds().unwrap();
        assert_eq!(bounds[0].interval, Interval::new(3.0, f64::INFINITY));

        let both = Predicate::All(vec![
            Predicate::compare(height("c1"), CompareOp::Ge, 2.0),
            Predicate::within(height("c1"), 3.0, 0.5),
        ]);
        assert_eq!(both.interval_bounds().unwrap().len(), 2);

        // Two references is not a single-parameter bound
        let relational = Predicate::compare(height("c1"), CompareOp::Le, height("c2"));
        assert!(relational.interval_bounds().is_none());
        let any = Predicate::Any(vec![Predicate::compare(height("c1"), CompareOp::Le, 2.0)]);
        assert!(any.interval_bounds().is_none());
    }

    #[test]
    fn test_slots_and_parameters() {
        let p = Predicate::All(vec![
            Predicate::compare(height("c1"), CompareOp::Le, height("c2")),
            Predicate::property_match("c2", "b1", "ConnectorType"),
        ]);
        let mut slots = BTreeSet::new();
        p.collect_slots(&mut slots);
        assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec!["b1", "c1", "c2"]);
        let mut params = BTreeSet::new();
        p.collect_parameters(&mut params);
        assert_eq!(params.len(), 2);
        let mut derived = Vec::new();
        p.collect_derived(&mut derived);
        assert!(derived.is_empty());

        let top = Predicate::Not(Box::new(Predicate::within(
            Expr::derived("c2", DerivedQuantity::Max(crate::Axis::Z)),
            Expr::derived("c1", DerivedQuantity::Length) + 0.5,
            1e-3,
        )));
        top.collect_derived(&mut derived);
        assert_eq!(
            derived,
            vec![
                ("c2", DerivedQuantity::Max(crate::Axis::Z)),
                ("c1", DerivedQuantity::Length)
            ]
        );
    }

    #[test]
    fn test_json_round_trip() {
        let p = Predicate::Not(Box::new(Predicate::property_equals("c1", "Material", "timber")));
        let json = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
