// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reparametrization: choose parameter values that satisfy constraints
//!
//! Two strategies are tried in order:
//!
//! 1. When every constraint on the instance reduces to interval bounds on
//!    its own parameters, the bounds are intersected with the declared
//!    domains and each parameter takes the feasible value closest to its
//!    seed (the midpoint when unseeded).
//! 2. Otherwise, or when the interval answer fails verification, a
//!    coordinate descent with step halving minimizes the summed constraint
//!    violation inside the domains.

use crate::error::{BoundViolation, InfeasibleReport, Result, SolveError};
use crate::options::{CancelFlag, SolverOptions};
use crate::request::SolveRequest;
use bimparam_constraints::{Bindings, ConstraintSet, ConstraintSpec, DerivedQuantity, Slot};
use bimparam_model::{
    Binding, Interval, ParameterKind, ParameterSpec, ParameterValues, ParametricTemplate,
    TemplateInstance, VersionedTemplate,
};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Produces template instances from solve requests
#[derive(Debug, Clone, Default)]
pub struct Reparametrizer {
    options: SolverOptions,
}

impl Reparametrizer {
    /// Create a reparametrizer with the given options
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Get the solver options
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solve a request without a cancellation source
    pub fn solve(&self, request: &SolveRequest) -> Result<TemplateInstance> {
        self.solve_with_cancel(request, &CancelFlag::new())
    }

    /// Solve a request
    ///
    /// # Arguments
    /// * `request` - Template version, constraints, seed and context
    /// * `cancel` - Checked before solving and between descent iterations
    ///
    /// # Returns
    /// A new instance whose parameters lie in the template domains and
    /// satisfy every constraint that reads the request key, or
    /// [`SolveError::Infeasible`] naming the blocking constraints and bounds
    pub fn solve_with_cancel(
        &self,
        request: &SolveRequest,
        cancel: &CancelFlag,
    ) -> Result<TemplateInstance> {
        self.options.validate()?;
        if cancel.is_cancelled() {
            return Err(SolveError::Cancelled);
        }

        let problem = Problem::new(request)?;
        let values = match problem.interval_solution()? {
            Some(values) => {
                log::debug!("Solved '{}' from interval bounds", request.key);
                values
            }
            None => problem.descend(&self.options, cancel)?,
        };
        problem.instantiate(values)
    }

    /// Re-solve an existing instance under new constraints
    ///
    /// The result keeps the key and placement, bumps the revision and links
    /// back to `previous`. Use [`SolveRequest::revision_of`] directly when
    /// context instances are needed.
    pub fn resolve(
        &self,
        previous: &TemplateInstance,
        template: VersionedTemplate,
        constraints: ConstraintSet,
    ) -> Result<TemplateInstance> {
        let request = SolveRequest::revision_of(previous, template).with_constraints(constraints);
        self.solve(&request)
    }

    /// Solve the same request from several seeds in parallel
    ///
    /// Results are returned in seed order.
    pub fn explore_seeds(
        &self,
        request: &SolveRequest,
        seeds: &[ParameterValues],
        cancel: &CancelFlag,
    ) -> Vec<Result<TemplateInstance>> {
        seeds
            .par_iter()
            .map(|seed| {
                let seeded = request.clone().with_seeds(seed.clone());
                self.solve_with_cancel(&seeded, cancel)
            })
            .collect()
    }
}

/// Outcome of evaluating one candidate assignment
struct Evaluation {
    violation: f64,
    violated: Vec<String>,
}

impl Evaluation {
    fn is_feasible(&self) -> bool {
        self.violated.is_empty()
    }
}

/// A request prepared for solving
struct Problem<'r> {
    request: &'r SolveRequest,
    template: &'r ParametricTemplate,
    /// Constraints that read the request key, all targets bound
    active: Vec<&'r ConstraintSpec>,
    /// Seed merged over defaults, snapped into the domains
    start: ParameterValues,
}

impl<'r> Problem<'r> {
    fn new(request: &'r SolveRequest) -> Result<Self> {
        let template = request.template.template.as_ref();
        template.validate()?;

        if let Some(name) = request.seed.keys().find(|n| template.parameter(n).is_none()) {
            return Err(SolveError::UnknownParameter(name.clone()));
        }
        let start = template
            .schema
            .iter()
            .map(|spec| {
                let value = request.seed.get(&spec.name).copied().unwrap_or(spec.default);
                (spec.name.clone(), snap(spec, value))
            })
            .collect();

        let bound: BTreeSet<&str> = request
            .context
            .iter()
            .map(|c| c.instance.key())
            .chain(std::iter::once(request.key.as_str()))
            .collect();
        let mut active = Vec::new();
        for constraint in request.constraints.for_instance(&request.key) {
            if let Some(missing) = constraint.targets.iter().find(|t| !bound.contains(t.as_str())) {
                return Err(SolveError::UnboundInstance(missing.clone()));
            }
            active.push(constraint);
        }
        log::trace!(
            "Solving '{}' against {} of {} constraints",
            request.key,
            active.len(),
            request.constraints.len()
        );

        Ok(Self {
            request,
            template,
            active,
            start,
        })
    }

    /// Generate a candidate and score it against the active constraints
    fn evaluate(&self, values: &ParameterValues) -> Result<Evaluation> {
        let shape = match bimparam_geometry::generate(self.template, values, &self.request.placement) {
            Ok(shape) => shape,
            Err(e) => {
                log::trace!("Candidate for '{}' not generated: {}", self.request.key, e);
                return Ok(Evaluation {
                    violation: f64::INFINITY,
                    violated: self.active.iter().map(|c| c.name.clone()).collect(),
                });
            }
        };

        let mut bindings = Bindings::new();
        for context in &self.request.context {
            bindings.bind_instance(&context.instance, &context.template);
        }
        bindings.bind(
            &self.request.key,
            Slot {
                template: self.template,
                values,
                descriptor: &shape.descriptor,
                properties: &shape.properties,
            },
        );

        let mut violation = 0.0;
        let mut violated = Vec::new();
        for constraint in &self.active {
            violation += constraint.violation(&bindings)?;
            if !constraint.evaluate(&bindings)? {
                violated.push(constraint.name.clone());
            }
        }
        Ok(Evaluation { violation, violated })
    }

    /// Closed-form answer when every constraint is an interval bound
    ///
    /// `Ok(None)` means the strategy does not apply or its answer failed
    /// verification.
    fn interval_solution(&self) -> Result<Option<ParameterValues>> {
        // parameter -> (required interval, None once disjoint; constraint names)
        let mut required: BTreeMap<&str, (Option<Interval>, Vec<&str>)> = BTreeMap::new();
        for constraint in &self.active {
            let Some(bounds) = constraint.predicate.interval_bounds() else {
                return Ok(None);
            };
            for bound in bounds {
                if bound.slot != self.request.key {
                    return Ok(None);
                }
                let spec = self.template.parameter(&bound.parameter).ok_or_else(|| {
                    SolveError::UnknownParameter(format!("{}.{}", bound.slot, bound.parameter))
                })?;
                let entry = required
                    .entry(spec.name.as_str())
                    .or_insert((Some(Interval::unbounded()), Vec::new()));
                entry.0 = entry.0.and_then(|i| i.intersect(&bound.interval));
                entry.1.push(constraint.name.as_str());
            }
        }

        let mut values = self.start.clone();
        let mut blocked = Vec::new();
        let mut blocking = BTreeSet::new();
        for (name, (interval, constraints)) in &required {
            let Some(spec) = self.template.parameter(name) else {
                continue;
            };
            let feasible = interval
                .and_then(|i| i.intersect(&spec.domain))
                .and_then(|i| admissible(spec, i));
            match feasible {
                Some(feasible) => {
                    let preferred = self
                        .request
                        .seed
                        .get(*name)
                        .copied()
                        .unwrap_or_else(|| feasible.midpoint());
                    let mut value = feasible.clamp(preferred);
                    if spec.kind == ParameterKind::Integer {
                        value = value.round().clamp(feasible.min, feasible.max);
                    }
                    values.insert(name.to_string(), value);
                }
                None => {
                    blocked.push(BoundViolation {
                        parameter: name.to_string(),
                        domain: spec.domain,
                        required: *interval,
                    });
                    blocking.extend(constraints.iter().copied());
                }
            }
        }

        if !blocked.is_empty() {
            let report = InfeasibleReport {
                violated_constraints: blocking.into_iter().map(str::to_string).collect(),
                violated_bounds: blocked,
                best: None,
            };
            log::debug!("'{}' infeasible: {}", self.request.key, report);
            return Err(SolveError::Infeasible(report));
        }

        let evaluation = self.evaluate(&values)?;
        if evaluation.is_feasible() {
            Ok(Some(values))
        } else {
            log::debug!(
                "Interval answer for '{}' violates [{}], falling back to descent",
                self.request.key,
                evaluation.violated.join(", ")
            );
            Ok(None)
        }
    }

    /// Coordinate descent with step halving on the summed violation
    fn descend(&self, options: &SolverOptions, cancel: &CancelFlag) -> Result<ParameterValues> {
        let schema = &self.template.schema;
        let mut current = self.start.clone();
        let mut score = self.evaluate(&current)?;
        if score.is_feasible() {
            return Ok(current);
        }

        let mut steps: Vec<f64> = schema
            .iter()
            .map(|spec| spec.domain.width() * options.initial_step_fraction)
            .collect();

        for iteration in 0..options.max_iterations {
            if cancel.is_cancelled() {
                log::debug!("Solve of '{}' cancelled after {} iterations", self.request.key, iteration);
                return Err(SolveError::Cancelled);
            }

            let mut improved = false;
            for (spec, step) in schema.iter().zip(&steps) {
                let here = current.get(&spec.name).copied().unwrap_or(spec.default);
                let step = match spec.kind {
                    ParameterKind::Real => *step,
                    ParameterKind::Integer => step.round().max(1.0),
                };
                for direction in [1.0, -1.0] {
                    let value = snap(spec, here + direction * step);
                    if value == here {
                        continue;
                    }
                    let mut candidate = current.clone();
                    candidate.insert(spec.name.clone(), value);
                    let evaluation = self.evaluate(&candidate)?;
                    if evaluation.is_feasible() {
                        log::debug!(
                            "Solved '{}' by descent in {} iterations",
                            self.request.key,
                            iteration + 1
                        );
                        return Ok(candidate);
                    }
                    if evaluation.violation < score.violation {
                        current = candidate;
                        score = evaluation;
                        improved = true;
                        break;
                    }
                }
            }

            if !improved {
                for step in steps.iter_mut() {
                    *step *= 0.5;
                }
                let exhausted = schema.iter().zip(&steps).all(|(spec, step)| match spec.kind {
                    ParameterKind::Real => *step <= spec.domain.width() * options.min_step_fraction,
                    ParameterKind::Integer => *step < 1.0,
                });
                if exhausted {
                    log::debug!(
                        "Descent for '{}' stalled after {} iterations at violation {}",
                        self.request.key,
                        iteration + 1,
                        score.violation
                    );
                    break;
                }
            }
        }

        Err(SolveError::Infeasible(self.report(current, score)))
    }

    /// Name the constraints left violated and the domain bounds the best
    /// candidate is pinned against
    ///
    /// A parameter counts when a violated constraint reads it directly, or
    /// reads a derived quantity of the request key that the rule computes
    /// from it.
    fn report(&self, best: ParameterValues, score: Evaluation) -> InfeasibleReport {
        let mut read = BTreeSet::new();
        let mut derived = Vec::new();
        for constraint in self.active.iter().filter(|c| score.violated.contains(&c.name)) {
            constraint.predicate.collect_parameters(&mut read);
            constraint.predicate.collect_derived(&mut derived);
        }
        let mut names: BTreeSet<&str> = read
            .into_iter()
            .filter(|(slot, _)| *slot == self.request.key)
            .map(|(_, name)| name)
            .collect();
        for (_, quantity) in derived.into_iter().filter(|(slot, _)| *slot == self.request.key) {
            names.extend(self.driving_parameters(quantity));
        }

        let violated_bounds = names
            .into_iter()
            .filter_map(|name| {
                let spec = self.template.parameter(name)?;
                let value = best.get(name).copied()?;
                let at_edge = spec.domain.width() > 0.0
                    && (value <= spec.domain.min || value >= spec.domain.max);
                at_edge.then(|| BoundViolation {
                    parameter: name.to_string(),
                    domain: spec.domain,
                    required: None,
                })
            })
            .collect();
        InfeasibleReport {
            violated_constraints: score.violated,
            violated_bounds,
            best: Some(best),
        }
    }

    /// Parameters the rule turns into a derived quantity
    fn driving_parameters(&self, quantity: DerivedQuantity) -> Vec<&'r str> {
        let rule = &self.template.rule;
        let bindings = match quantity {
            DerivedQuantity::Length => vec![&rule.length],
            DerivedQuantity::Depth => vec![&rule.depth],
            DerivedQuantity::Width => vec![&rule.width],
            // bounds depend on every extent once the axis is oriented
            DerivedQuantity::Min(_) | DerivedQuantity::Max(_) | DerivedQuantity::Center(_) => {
                vec![&rule.length, &rule.depth, &rule.width]
            }
        };
        bindings
            .into_iter()
            .filter_map(|binding| match binding {
                Binding::Parameter(name) => Some(name.as_str()),
                Binding::Constant(_) => None,
            })
            .collect()
    }

    fn instantiate(&self, parameters: ParameterValues) -> Result<TemplateInstance> {
        self.template.check_values(&parameters)?;
        let shape = bimparam_geometry::generate(self.template, &parameters, &self.request.placement)?;
        Ok(TemplateInstance {
            id: self.request.instance_id(),
            template: self.request.template.reference.clone(),
            parameters,
            placement: self.request.placement,
            descriptor: shape.descriptor,
            properties: shape.properties,
            supersedes: self.request.supersedes.clone(),
        })
    }
}

/// Clamp into the domain, rounding integers
fn snap(spec: &ParameterSpec, value: f64) -> f64 {
    let clamped = spec.domain.clamp(value);
    match spec.kind {
        ParameterKind::Real => clamped,
        ParameterKind::Integer => admissible(spec, spec.domain)
            .map(|i| clamped.round().clamp(i.min, i.max))
            .unwrap_or(clamped),
    }
}

/// Part of an interval the parameter kind can take
fn admissible(spec: &ParameterSpec, interval: Interval) -> Option<Interval> {
    match spec.kind {
        ParameterKind::Real => Some(interval),
        ParameterKind::Integer => {
            let (min, max) = (interval.min.ceil(), interval.max.floor());
            (min <= max).then_some(Interval::new(min, max))
        }
    }
}
