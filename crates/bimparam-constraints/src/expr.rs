// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric expressions over bound instances

use crate::bindings::Bindings;
use crate::error::{ConstraintError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops;

/// World axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Quantity read from an instance's generated geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedQuantity {
    /// Longest principal extent
    Length,
    /// Major section extent
    Depth,
    /// Minor section extent
    Width,
    /// Lower bound of the bounding box along an axis
    Min(Axis),
    /// Upper bound of the bounding box along an axis
    Max(Axis),
    /// Bounding box center along an axis
    Center(Axis),
}

/// Numeric expression
///
/// Division by zero yields NaN, and so does a missing or non-numeric
/// property; every comparison against NaN is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Const(f64),
    /// Parameter of the instance bound to `slot`
    Param { slot: String, name: String },
    Derived { slot: String, quantity: DerivedQuantity },
    /// Numeric property of the instance bound to `slot`
    Property { slot: String, name: String },
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Abs(Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Constant
    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    /// Parameter reference
    pub fn param(slot: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Param {
            slot: slot.into(),
            name: name.into(),
        }
    }

    /// Derived geometric quantity
    pub fn derived(slot: impl Into<String>, quantity: DerivedQuantity) -> Self {
        Expr::Derived {
            slot: slot.into(),
            quantity,
        }
    }

    /// Property reference
    pub fn property(slot: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Property {
            slot: slot.into(),
            name: name.into(),
        }
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Expr::Abs(Box::new(self))
    }

    /// Smaller of two expressions
    pub fn min(self, other: Expr) -> Self {
        Expr::Min(Box::new(self), Box::new(other))
    }

    /// Larger of two expressions
    pub fn max(self, other: Expr) -> Self {
        Expr::Max(Box::new(self), Box::new(other))
    }

    /// Evaluate against bound instances
    ///
    /// Parameter domains are not checked here; see
    /// [`ConstraintSpec::evaluate`](crate::ConstraintSpec::evaluate).
    pub fn eval(&self, bindings: &Bindings<'_>) -> Result<f64> {
        Ok(match self {
            Expr::Const(v) => *v,
            Expr::Param { slot, name } => {
                let bound = bindings.get(slot)?;
                bound.values.get(name).copied().ok_or_else(|| {
                    ConstraintError::UnknownParameter {
                        slot: slot.clone(),
                        parameter: name.clone(),
                    }
                })?
            }
            Expr::Derived { slot, quantity } => {
                let d = bindings.get(slot)?.descriptor;
                match quantity {
                    DerivedQuantity::Length => d.length,
                    DerivedQuantity::Depth => d.depth,
                    DerivedQuantity::Width => d.width,
                    DerivedQuantity::Min(axis) => d.bounds.min[axis.index()],
                    DerivedQuantity::Max(axis) => d.bounds.max[axis.index()],
                    DerivedQuantity::Center(axis) => d.bounds.center()[axis.index()],
                }
            }
            Expr::Property { slot, name } => bindings
                .get(slot)?
                .properties
                .get(name)
                .and_then(|v| v.as_f64())
                .unwrap_or(f64::NAN),
            Expr::Add(a, b) => a.eval(bindings)? + b.eval(bindings)?,
            Expr::Sub(a, b) => a.eval(bindings)? - b.eval(bindings)?,
            Expr::Mul(a, b) => a.eval(bindings)? * b.eval(bindings)?,
            Expr::Div(a, b) => {
                let numerator = a.eval(bindings)?;
                let denominator = b.eval(bindings)?;
                if denominator == 0.0 {
                    f64::NAN
                } else {
                    numerator / denominator
                }
            }
            Expr::Neg(a) => -a.eval(bindings)?,
            Expr::Abs(a) => a.eval(bindings)?.abs(),
            // f64::min/max would hide a NaN operand
            Expr::Min(a, b) => nan_aware(a.eval(bindings)?, b.eval(bindings)?, f64::min),
            Expr::Max(a, b) => nan_aware(a.eval(bindings)?, b.eval(bindings)?, f64::max),
        })
    }

    /// Value of an expression without references, if it is one
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Expr::Const(v) => Some(*v),
            Expr::Param { .. } | Expr::Derived { .. } | Expr::Property { .. } => None,
            Expr::Add(a, b) => Some(a.constant_value()? + b.constant_value()?),
            Expr::Sub(a, b) => Some(a.constant_value()? - b.constant_value()?),
            Expr::Mul(a, b) => Some(a.constant_value()? * b.constant_value()?),
            Expr::Div(a, b) => {
                let denominator = b.constant_value()?;
                let numerator = a.constant_value()?;
                Some(if denominator == 0.0 {
                    f64::NAN
                } else {
                    numerator / denominator
                })
            }
            Expr::Neg(a) => Some(-a.constant_value()?),
            Expr::Abs(a) => Some(a.constant_value()?.abs()),
            Expr::Min(a, b) => Some(nan_aware(a.constant_value()?, b.constant_value()?, f64::min)),
            Expr::Max(a, b) => Some(nan_aware(a.constant_value()?, b.constant_value()?, f64::max)),
        }
    }

    /// Collect `(slot, parameter)` pairs the expression reads
    pub fn collect_parameters<'a>(&'a self, out: &mut BTreeSet<(&'a str, &'a str)>) {
        self.visit(&mut |e| {
            if let Expr::Param { slot, name } = e {
                out.insert((slot.as_str(), name.as_str()));
            }
        });
    }

    /// Collect `(slot, quantity)` pairs of derived geometry the expression reads
    pub fn collect_derived<'a>(&'a self, out: &mut Vec<(&'a str, DerivedQuantity)>) {
        self.visit(&mut |e| {
            if let Expr::Derived { slot, quantity } = e {
                out.push((slot.as_str(), *quantity));
            }
        });
    }

    /// Collect every slot the expression reads
    pub fn collect_slots<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        self.visit(&mut |e| match e {
            Expr::Param { slot, .. } | Expr::Derived { slot, .. } | Expr::Property { slot, .. } => {
                out.insert(slot.as_str());
            }
            _ => {}
        });
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Min(a, b)
            | Expr::Max(a, b) => {
                a.visit(f);
                b.visit(f);
            }
            Expr::Neg(a) | Expr::Abs(a) => a.visit(f),
            Expr::Const(_) | Expr::Param { .. } | Expr::Derived { .. } | Expr::Property { .. } => {}
        }
    }
}

fn nan_aware(a: f64, b: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Const(v)
    }
}

macro_rules! binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(self), Box::new(rhs))
            }
        }

        impl ops::$trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                Expr::$variant(Box::new(self), Box::new(Expr::Const(rhs)))
            }
        }
    };
}

binary_op!(Add, add, Add);
binary_op!(Sub, sub, Sub);
binary_op!(Mul, mul, Mul);
binary_op!(Div, div, Div);

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Slot;
    use approx::assert_relative_eq;
    use bimparam_model::{
        BoundingBox, Binding, GenerativeRule, GeometricDescriptor, Interval, ParameterSpec,
        ParameterValues, ParametricTemplate, PrincipalAxis, ProfileKind, PropertyMap,
        SemanticCategory, TemplateId,
    };
    use std::collections::BTreeMap;

    fn template() -> ParametricTemplate {
        ParametricTemplate {
            id: TemplateId::new("column-001"),
            category: SemanticCategory::Column,
            schema: vec![ParameterSpec::real(
                "height",
                Interval::new(3.0, 3.1),
                Interval::new(1.5, 6.2),
                3.05,
            )],
            rule: GenerativeRule {
                category: SemanticCategory::Column,
                profile: ProfileKind::Rectangle,
                direction: [0.0, 0.0, 1.0],
                reference: [1.0, 0.0, 0.0],
                length: Binding::Parameter("height".to_string()),
                depth: Binding::Constant(0.4),
                width: Binding::Constant(0.4),
                fill_ratio: 1.0,
                stations: vec![1.0; 5],
                properties: BTreeMap::new(),
            },
            provenance: Default::default(),
        }
    }

    fn descriptor() -> GeometricDescriptor {
        GeometricDescriptor {
            bounds: BoundingBox::new([-0.2, -0.2, 0.0], [0.2, 0.2, 3.0]),
            axis: PrincipalAxis::default(),
            length: 3.0,
            depth: 0.4,
            width: 0.4,
            section: None,
        }
    }

    #[test]
    fn test_eval() {
        let template = template();
        let values: ParameterValues = [("height".to_string(), 3.0)].into_iter().collect();
        let descriptor = descriptor();
        let properties: PropertyMap = [("Bars".to_string(), 4i64.into())].into_iter().collect();
        let bindings = Bindings::new().with(
            "c1",
            Slot {
                template: &template,
                values: &values,
                descriptor: &descriptor,
                properties: &properties,
            },
        );

        let e = Expr::param("c1", "height") * 2.0 + Expr::derived("c1", DerivedQuantity::Max(Axis::Z));
        assert_relative_eq!(e.eval(&bindings).unwrap(), 9.0);
        assert_relative_eq!(
            Expr::derived("c1", DerivedQuantity::Center(Axis::Z)).eval(&bindings).unwrap(),
            1.5
        );
        assert_relative_eq!(Expr::property("c1", "Bars").eval(&bindings).unwrap(), 4.0);
        assert!(Expr::property("c1", "Missing").eval(&bindings).unwrap().is_nan());
        assert!((Expr::constant(1.0) / Expr::constant(0.0)).eval(&bindings).unwrap().is_nan());
        assert!(Expr::constant(f64::NAN).min(Expr::constant(1.0)).eval(&bindings).unwrap().is_nan());

        assert_eq!(
            Expr::param("c2", "height").eval(&bindings),
            Err(ConstraintError::UnboundSlot("c2".to_string()))
        );
        assert!(matches!(
            Expr::param("c1", "width").eval(&bindings),
            Err(ConstraintError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_constant_folding_and_references() {
        assert_eq!((Expr::constant(4.0) + 0.5).constant_value(), Some(4.5));
        let e = (Expr::param("a", "height") - Expr::derived("b", DerivedQuantity::Length)).abs();
        assert_eq!(e.constant_value(), None);

        let mut params = BTreeSet::new();
        e.collect_parameters(&mut params);
        assert_eq!(params.into_iter().collect::<Vec<_>>(), vec![("a", "height")]);
        let mut slots = BTreeSet::new();
        e.collect_slots(&mut slots);
        assert_eq!(slots.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_json_shape() {
        let e = Expr::param("c1", "height") + 1.0;
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"add":[{"param":{"slot":"c1","name":"height"}},{"const":1.0}]}"#);
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
