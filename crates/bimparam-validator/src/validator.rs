// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembly validation
//!
//! Checks run in a fixed order and every finding is kept:
//!
//! 1. asserted relations against member bounding boxes
//! 2. constraints that read any member
//! 3. pairwise collisions between members not marked compatible

use crate::options::ValidatorOptions;
use crate::report::{ValidationReport, Violation};
use bimparam_constraints::{Bindings, ConstraintSet};
use bimparam_geometry::{contains, gap, overlaps, penetration};
use bimparam_model::{
    AssertedRelation, Assembly, BoundingBox, Certificate, ParametricTemplate, RelationKind,
    TemplateInstance, TemplateLookup,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validates assemblies and issues certificates
#[derive(Debug, Clone, Default)]
pub struct AssemblyValidator {
    options: ValidatorOptions,
}

impl AssemblyValidator {
    /// Create a validator with the given tolerances
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    /// Get the validator options
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate an assembly
    ///
    /// # Arguments
    /// * `assembly` - Members, asserted relations and compatible pairs
    /// * `constraints` - Constraints to check; those reading no member are skipped
    /// * `lookup` - Resolves member template versions for constraint evaluation
    ///
    /// # Returns
    /// A certificate pinning the checked member revisions, or a report with
    /// every violation found. The result depends only on the inputs.
    pub fn validate(
        &self,
        assembly: &Assembly,
        constraints: &ConstraintSet,
        lookup: &dyn TemplateLookup,
    ) -> Result<Certificate, ValidationReport> {
        let mut violations = self.check_relations(assembly);
        let checked = self.check_constraints(assembly, constraints, lookup, &mut violations);
        violations.extend(self.check_collisions(assembly));

        if !violations.is_empty() {
            log::debug!(
                "Assembly '{}' rejected with {} violation(s)",
                assembly.name(),
                violations.len()
            );
            return Err(ValidationReport {
                assembly: assembly.name().to_string(),
                violations,
            });
        }

        log::debug!(
            "Assembly '{}' certified: {} members, {} relations, {} constraints",
            assembly.name(),
            assembly.members().len(),
            assembly.relations().len(),
            checked.len()
        );
        Ok(Certificate::issue(assembly, checked))
    }

    fn check_relations(&self, assembly: &Assembly) -> Vec<Violation> {
        assembly
            .relations()
            .iter()
            .filter_map(|relation| {
                self.relation_mismatch(assembly, relation)
                    .map(|detail| Violation::RelationMismatch {
                        relation: relation.clone(),
                        detail,
                    })
            })
            .collect()
    }

    /// Why a relation does not hold, if it does not
    ///
    /// Containment reads as `from` lying inside `to`.
    fn relation_mismatch(&self, assembly: &Assembly, relation: &AssertedRelation) -> Option<String> {
        let Some(from) = assembly.member(&relation.from) else {
            return Some(format!("unknown member '{}'", relation.from));
        };
        let Some(to) = assembly.member(&relation.to) else {
            return Some(format!("unknown member '{}'", relation.to));
        };
        let (a, b) = (&from.descriptor.bounds, &to.descriptor.bounds);
        match relation.kind {
            RelationKind::Adjacency => gap_beyond(a, b, self.options.adjacency_tolerance),
            RelationKind::Connection => gap_beyond(a, b, self.options.connection_tolerance),
            RelationKind::Containment => (!contains(b, a, self.options.containment_tolerance))
                .then(|| format!("'{}' is not inside '{}'", relation.from, relation.to)),
        }
    }

    /// Evaluate constraints reading any member
    ///
    /// Returns constraint name -> member keys for every constraint that held.
    fn check_constraints(
        &self,
        assembly: &Assembly,
        constraints: &ConstraintSet,
        lookup: &dyn TemplateLookup,
        violations: &mut Vec<Violation>,
    ) -> BTreeMap<String, Vec<String>> {
        let templates: BTreeMap<&str, Arc<ParametricTemplate>> = assembly
            .members()
            .iter()
            .filter_map(|m| lookup.lookup(&m.template).map(|t| (m.key(), t)))
            .collect();
        let mut bindings = Bindings::new();
        for member in assembly.members() {
            if let Some(template) = templates.get(member.key()) {
                bindings.bind_instance(member, template);
            }
        }

        let mut checked = BTreeMap::new();
        for constraint in constraints {
            if !constraint
                .targets
                .iter()
                .any(|t| assembly.member(t).is_some())
            {
                continue;
            }
            let instances: Vec<String> = constraint.targets.iter().cloned().collect();
            let unresolved: Vec<&str> = constraint
                .targets
                .iter()
                .map(String::as_str)
                .filter(|t| assembly.member(t).is_none())
                .collect();
            let unavailable = assembly
                .members()
                .iter()
                .filter(|m| constraint.targets_instance(m.key()))
                .find(|m| !templates.contains_key(m.key()));

            let detail = if !unresolved.is_empty() {
                Some(format!("unresolved instances: {}", unresolved.join(", ")))
            } else if let Some(member) = unavailable {
                Some(missing_template(member))
            } else {
                match constraint.evaluate(&bindings) {
                    Ok(true) => {
                        checked.insert(constraint.name.clone(), instances);
                        continue;
                    }
                    Ok(false) => None,
                    Err(e) => Some(e.to_string()),
                }
            };
            violations.push(Violation::ConstraintViolation {
                constraint: constraint.name.clone(),
                instances,
                detail,
            });
        }
        checked
    }

    fn check_collisions(&self, assembly: &Assembly) -> Vec<Violation> {
        let members = assembly.members();
        let tolerance = self.options.overlap_tolerance;
        (0..members.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                (i + 1..members.len()).filter_map(move |j| {
                    let (a, b) = (&members[i], &members[j]);
                    if assembly.is_compatible(a.key(), b.key()) {
                        return None;
                    }
                    let (ba, bb) = (&a.descriptor.bounds, &b.descriptor.bounds);
                    overlaps(ba, bb, tolerance).then(|| Violation::CollisionConflict {
                        a: a.key().to_string(),
                        b: b.key().to_string(),
                        penetration: penetration(ba, bb),
                    })
                })
            })
            .collect()
    }
}

fn gap_beyond(a: &BoundingBox, b: &BoundingBox, tolerance: f64) -> Option<String> {
    let distance = gap(a, b);
    (distance > tolerance).then(|| format!("gap {:.3} exceeds tolerance {}", distance, tolerance))
}

fn missing_template(member: &TemplateInstance) -> String {
    format!("template {} of '{}' is not available", member.template, member.key())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bimparam_constraints::{ConstraintSpec, Expr, Predicate};
    use bimparam_model::{
        Binding, GenerativeRule, InstanceId, Interval, ParameterSpec, Placement, ProfileKind,
        SemanticCategory, TemplateId, TemplateRef,
    };

    pub(crate) fn column() -> ParametricTemplate {
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

    pub(crate) struct Library(pub Arc<ParametricTemplate>);

    impl TemplateLookup for Library {
        fn lookup(&self, reference: &TemplateRef) -> Option<Arc<ParametricTemplate>> {
            (reference == &TemplateRef::new("column-001", 1)).then(|| self.0.clone())
        }
    }

    pub(crate) fn library() -> Library {
        Library(Arc::new(column()))
    }

    /// 0.4 m square column standing at `(x, 0, 0)`
    pub(crate) fn column_at(key: &str, x: f64, height: f64) -> TemplateInstance {
        let template = column();
        let parameters = [("height".to_string(), height)].into_iter().collect();
        let placement = Placement::at(x, 0.0, 0.0);
        let shape = bimparam_geometry::generate(&template, &parameters, &placement).unwrap();
        TemplateInstance {
            id: InstanceId::new(key),
            template: TemplateRef::new("column-001", 1),
            parameters,
            placement,
            descriptor: shape.descriptor,
            properties: shape.properties,
            supersedes: None,
        }
    }

    pub(crate) fn pair(distance: f64) -> Assembly {
        let mut assembly = Assembly::new("frame")
            .with_member(column_at("c1", 0.0, 3.0))
            .unwrap()
            .with_member(column_at("c2", 0.4 + distance, 3.0))
            .unwrap();
        assembly.relate(RelationKind::Adjacency, "c1", "c2");
        assembly
    }

    fn same_height() -> ConstraintSet {
        ConstraintSet::new().with(ConstraintSpec::new(
            "same-height",
            Predicate::equals(Expr::param("c1", "height"), Expr::param("c2", "height"), 1e-9),
        ))
    }

    #[test]
    fn test_touching_columns_certified() {
        let assembly = pair(0.0);
        let certificate = AssemblyValidator::default()
            .validate(&assembly, &same_height(), &library())
            .unwrap();
        assert_eq!(certificate.assembly, "frame");
        assert_eq!(certificate.members["c1"].id, InstanceId::new("c1"));
        assert_eq!(certificate.relations.len(), 1);
        assert_eq!(
            certificate.constraints["same-height"],
            vec!["c1".to_string(), "c2".to_string()]
        );
        assert!(certificate.matches(&assembly));
    }

    #[test]
    fn test_distant_adjacency_rejected() {
        let report = AssemblyValidator::default()
            .validate(&pair(2.0), &ConstraintSet::new(), &library())
            .unwrap_err();
        assert_eq!(report.len(), 1);
        match &report.violations[0] {
            Violation::RelationMismatch { relation, detail } => {
                assert_eq!(relation.from, "c1");
                assert!(detail.starts_with("gap 2.000"));
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_unknown_relation_member() {
        let mut assembly = pair(0.0);
        assembly.relate(RelationKind::Connection, "c1", "ghost");
        let report = AssemblyValidator::default()
            .validate(&assembly, &ConstraintSet::new(), &library())
            .unwrap_err();
        assert_eq!(
            report.violations,
            vec![Violation::RelationMismatch {
                relation: AssertedRelation {
                    kind: RelationKind::Connection,
                    from: "c1".to_string(),
                    to: "ghost".to_string(),
                },
                detail: "unknown member 'ghost'".to_string(),
            }]
        );
    }

    #[test]
    fn test_collision_unless_compatible() {
        let mut assembly = Assembly::new("stack")
            .with_member(column_at("outer", 0.0, 6.0))
            .unwrap()
            .with_member(column_at("inner", 0.0, 3.0))
            .unwrap();
        assembly.relate(RelationKind::Containment, "inner", "outer");

        let validator = AssemblyValidator::default();
        let report = validator
            .validate(&assembly, &ConstraintSet::new(), &library())
            .unwrap_err();
        assert_eq!(report.collisions().count(), 1);
        assert_eq!(report.relation_mismatches().count(), 0);

        assembly.mark_compatible("inner", "outer");
        assert!(validator
            .validate(&assembly, &ConstraintSet::new(), &library())
            .is_ok());
    }

    #[test]
    fn test_containment_direction() {
        let mut assembly = Assembly::new("stack")
            .with_member(column_at("outer", 0.0, 6.0))
            .unwrap()
            .with_member(column_at("inner", 0.0, 3.0))
            .unwrap();
        assembly.mark_compatible("inner", "outer");
        assembly.relate(RelationKind::Containment, "outer", "inner");
        let report = AssemblyValidator::default()
            .validate(&assembly, &ConstraintSet::new(), &library())
            .unwrap_err();
        assert_eq!(report.relation_mismatches().count(), 1);
    }

    #[test]
    fn test_constraint_violations() {
        let assembly = Assembly::new("frame")
            .with_member(column_at("c1", 0.0, 3.0))
            .unwrap()
            .with_member(column_at("c2", 1.0, 4.0))
            .unwrap();
        let constraints = same_height().with(ConstraintSpec::new(
            "pair-with-missing",
            Predicate::equals(Expr::param("c1", "height"), Expr::param("c9", "height"), 1e-9),
        ));

        let report = AssemblyValidator::default()
            .validate(&assembly, &constraints, &library())
            .unwrap_err();
        let found: Vec<&Violation> = report.constraint_violations().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(
            found[0],
            &Violation::ConstraintViolation {
                constraint: "pair-with-missing".to_string(),
                instances: vec!["c1".to_string(), "c9".to_string()],
                detail: Some("unresolved instances: c9".to_string()),
            }
        );
        assert_eq!(
            found[1],
            &Violation::ConstraintViolation {
                constraint: "same-height".to_string(),
                instances: vec!["c1".to_string(), "c2".to_string()],
                detail: None,
            }
        );
    }

    #[test]
    fn test_missing_template_reported() {
        struct Empty;
        impl TemplateLookup for Empty {
            fn lookup(&self, _: &TemplateRef) -> Option<Arc<ParametricTemplate>> {
                None
            }
        }
        let report = AssemblyValidator::default()
            .validate(&pair(0.0), &same_height(), &Empty)
            .unwrap_err();
        match &report.violations[0] {
            Violation::ConstraintViolation { detail: Some(detail), .. } => {
                assert_eq!(detail, "template column-001@v1 of 'c1' is not available");
            }
            other => panic!("unexpected violation {:?}", other),
        }
    }

    #[test]
    fn test_all_findings_in_check_order() {
        let mut assembly = Assembly::new("frame")
            .with_member(column_at("c1", 0.0, 3.0))
            .unwrap()
            .with_member(column_at("c2", 0.0, 4.0))
            .unwrap()
            .with_member(column_at("c3", 5.0, 3.0))
            .unwrap();
        assembly.relate(RelationKind::Adjacency, "c1", "c3");

        let report = AssemblyValidator::default()
            .validate(&assembly, &same_height(), &library())
            .unwrap_err();
        let kinds: Vec<&str> = report
            .iter()
            .map(|v| match v {
                Violation::RelationMismatch { .. } => "relation",
                Violation::ConstraintViolation { .. } => "constraint",
                Violation::CollisionConflict { .. } => "collision",
            })
            .collect();
        assert_eq!(kinds, vec!["relation", "constraint", "collision"]);
    }

    #[test]
    fn test_revalidation_is_stable() {
        let assembly = pair(0.0);
        let validator = AssemblyValidator::default();
        let first = validator
            .validate(&assembly, &same_height(), &library())
            .unwrap();
        let second = validator
            .validate(&assembly, &same_height(), &library())
            .unwrap();
        assert_eq!(first, second);
    }
}
