// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named constraints and constraint sets

use crate::bindings::Bindings;
use crate::error::{ConstraintError, Result};
use crate::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named predicate over one or more instances
///
/// Targets are the instance keys the predicate reads. A constraint with a
/// single target is intra-instance; with two or more it is inter-instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub name: String,
    pub predicate: Predicate,
    pub targets: BTreeSet<String>,
}

impl ConstraintSpec {
    /// Create a constraint; targets are taken from the predicate
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        let mut slots = BTreeSet::new();
        predicate.collect_slots(&mut slots);
        let targets = slots.into_iter().map(str::to_string).collect();
        Self {
            name: name.into(),
            predicate,
            targets,
        }
    }

    /// Check if the constraint reads a single instance
    pub fn is_intra(&self) -> bool {
        self.targets.len() == 1
    }

    /// Check if the constraint relates several instances
    pub fn is_inter(&self) -> bool {
        self.targets.len() > 1
    }

    /// Check if the constraint reads the given instance
    pub fn targets_instance(&self, key: &str) -> bool {
        self.targets.contains(key)
    }

    /// Check every referenced parameter against its slot's declared domain
    pub fn check_domains(&self, bindings: &Bindings<'_>) -> Result<()> {
        let mut parameters = BTreeSet::new();
        self.predicate.collect_parameters(&mut parameters);
        for (slot, name) in parameters {
            let bound = bindings.get(slot)?;
            let spec = bound.template.parameter(name).ok_or_else(|| {
                ConstraintError::UnknownParameter {
                    slot: slot.to_string(),
                    parameter: name.to_string(),
                }
            })?;
            let value = bound.values.get(name).copied().unwrap_or(spec.default);
            if !spec.admits(value) {
                return Err(ConstraintError::DomainViolation {
                    slot: slot.to_string(),
                    parameter: name.to_string(),
                    value,
                    domain: spec.domain,
                });
            }
        }
        Ok(())
    }

    /// Evaluate the constraint
    ///
    /// Domains are checked first; the predicate only runs on in-domain
    /// values.
    pub fn evaluate(&self, bindings: &Bindings<'_>) -> Result<bool> {
        self.check_domains(bindings).inspect_err(|e| {
            log::trace!("Constraint '{}' not evaluated: {}", self.name, e);
        })?;
        self.predicate.holds(bindings)
    }

    /// Violation magnitude after the domain check
    pub fn violation(&self, bindings: &Bindings<'_>) -> Result<f64> {
        self.check_domains(bindings)?;
        self.predicate.violation(bindings)
    }
}

/// Conjunction of named constraints, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet {
    constraints: BTreeMap<String, ConstraintSpec>,
}

impl ConstraintSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint, returning the one it replaces
    pub fn insert(&mut self, constraint: ConstraintSpec) -> Option<ConstraintSpec> {
        self.constraints.insert(constraint.name.clone(), constraint)
    }

    /// Builder form of [`ConstraintSet::insert`]
    pub fn with(mut self, constraint: ConstraintSpec) -> Self {
        self.insert(constraint);
        self
    }

    /// Look up a constraint by name
    pub fn get(&self, name: &str) -> Option<&ConstraintSpec> {
        self.constraints.get(name)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Constraints in name order
    pub fn iter(&self) -> impl Iterator<Item = &ConstraintSpec> {
        self.constraints.values()
    }

    /// Check if every constraint of this set is also in `other`
    pub fn is_subset_of(&self, other: &ConstraintSet) -> bool {
        self.constraints
            .iter()
            .all(|(name, c)| other.constraints.get(name) == Some(c))
    }

    /// Constraints that read the given instance
    pub fn for_instance<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ConstraintSpec> + 'a {
        self.iter().filter(move |c| c.targets_instance(key))
    }

    /// Subset of constraints that only read the given instances
    pub fn restricted_to(&self, keys: &BTreeSet<&str>) -> ConstraintSet {
        ConstraintSet {
            constraints: self
                .constraints
                .iter()
                .filter(|(_, c)| c.targets.iter().all(|t| keys.contains(t.as_str())))
                .map(|(name, c)| (name.clone(), c.clone()))
                .collect(),
        }
    }

    /// Evaluate every constraint
    pub fn evaluate_all(&self, bindings: &Bindings<'_>) -> BTreeMap<String, Result<bool>> {
        self.constraints
            .iter()
            .map(|(name, c)| (name.clone(), c.evaluate(bindings)))
            .collect()
    }

    /// Check if every constraint evaluates to true
    pub fn is_satisfied(&self, bindings: &Bindings<'_>) -> bool {
        self.iter()
            .all(|c| matches!(c.evaluate(bindings), Ok(true)))
    }
}

impl FromIterator<ConstraintSpec> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = ConstraintSpec>>(iter: I) -> Self {
        let mut set = ConstraintSet::new();
        for constraint in iter {
            set.insert(constraint);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a ConstraintSpec;
    type IntoIter = std::collections::btree_map::Values<'a, String, ConstraintSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Slot;
    use crate::expr::{DerivedQuantity, Expr};
    use crate::predicate::CompareOp;
    use bimparam_model::{
        Binding, BoundingBox, GenerativeRule, GeometricDescriptor, Interval, ParameterSpec,
        ParameterValues, ParametricTemplate, PrincipalAxis, ProfileKind, PropertyMap,
        SemanticCategory, TemplateId,
    };

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

    fn descriptor(height: f64) -> GeometricDescriptor {
        GeometricDescriptor {
            bounds: BoundingBox::new([-0.2, -0.2, 0.0], [0.2, 0.2, height]),
            axis: PrincipalAxis::default(),
            length: height,
            depth: 0.4,
            width: 0.4,
            section: None,
        }
    }

    fn values(height: f64) -> ParameterValues {
        [("height".to_string(), height)].into_iter().collect()
    }

    #[test]
    fn test_intra_and_inter() {
        let intra = ConstraintSpec::new(
            "c1-height",
            Predicate::equals(Expr::param("c1", "height"), 4.5, 0.0),
        );
        assert!(intra.is_intra());
        let inter = ConstraintSpec::new(
            "same-height",
            Predicate::equals(Expr::param("c1", "height"), Expr::param("c2", "height"), 1e-6),
        );
        assert!(inter.is_inter());
        assert_eq!(inter.targets.len(), 2);
    }

    #[test]
    fn test_domain_checked_before_predicate() {
        let template = template();
        let inside = values(4.5);
        let outside = values(10.0);
        let d = descriptor(4.5);
        let props = PropertyMap::new();
        let constraint = ConstraintSpec::new(
            "tall",
            Predicate::compare(Expr::param("c1", "height"), CompareOp::Ge, 4.0),
        );

        let ok = Bindings::new().with(
            "c1",
            Slot {
                template: &template,
                values: &inside,
                descriptor: &d,
                properties: &props,
            },
        );
        assert_eq!(constraint.evaluate(&ok), Ok(true));

        let bad = Bindings::new().with(
            "c1",
            Slot {
                template: &template,
                values: &outside,
                descriptor: &d,
                properties: &props,
            },
        );
        assert!(matches!(
            constraint.evaluate(&bad),
            Err(ConstraintError::DomainViolation { value, .. }) if value == 10.0
        ));

        let unknown = ConstraintSpec::new(
            "wide",
            Predicate::compare(Expr::param("c1", "width"), CompareOp::Ge, 0.1),
        );
        assert!(matches!(
            unknown.evaluate(&ok),
            Err(ConstraintError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_set_operations() {
        let a = ConstraintSpec::new(
            "a",
            Predicate::compare(Expr::param("c1", "height"), CompareOp::Le, 5.0),
        );
        let b = ConstraintSpec::new(
            "b",
            Predicate::compare(
                Expr::derived("c1", DerivedQuantity::Max(crate::Axis::Z)),
                CompareOp::Le,
                Expr::derived("c2", DerivedQuantity::Min(crate::Axis::Z)),
            ),
        );
        let small: ConstraintSet = [a.clone()].into_iter().collect();
        let large = ConstraintSet::new().with(a).with(b);

        assert!(small.is_subset_of(&large));
        assert!(!large.is_subset_of(&small));
        assert_eq!(large.for_instance("c2").count(), 1);
        assert_eq!(large.for_instance("c1").count(), 2);

        let only_c1: BTreeSet<&str> = ["c1"].into_iter().collect();
        assert_eq!(large.restricted_to(&only_c1).len(), 1);
        let names: Vec<&str> = large.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_satisfaction() {
        let template = template();
        let v = values(4.5);
        let d = descriptor(4.5);
        let props = PropertyMap::new();
        let bindings = Bindings::new().with(
            "c1",
            Slot {
                template: &template,
                values: &v,
                descriptor: &d,
                properties: &props,
            },
        );
        let set = ConstraintSet::new()
            .with(ConstraintSpec::new(
                "height",
                Predicate::equals(Expr::param("c1", "height"), 4.5, 0.0),
            ))
            .with(ConstraintSpec::new(
                "top",
                Predicate::within(Expr::derived("c1", DerivedQuantity::Max(crate::Axis::Z)), 4.5, 1e-9),
            ));
        assert!(set.is_satisfied(&bindings));
        let results = set.evaluate_all(&bindings);
        assert_eq!(results["top"], Ok(true));

        let violated = set.clone().with(ConstraintSpec::new(
            "short",
            Predicate::compare(Expr::param("c1", "height"), CompareOp::Lt, 4.0),
        ));
        assert!(!violated.is_satisfied(&bindings));
        let v = violated.get("short").unwrap().violation(&bindings).unwrap();
        assert!((v - 0.5).abs() < 1e-12);
    }
}
