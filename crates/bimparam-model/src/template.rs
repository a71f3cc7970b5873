// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric templates: parameter schema plus a data-described generative rule
//!
//! A template captures a family of recurring elements. Its generative rule is
//! plain data (bindings from parameters or constants to geometric extents and
//! derived properties), so evaluating it is deterministic and side-effect
//! free, and templates can be serialized without loss.

use crate::{ElementId, ModelError, ProfileKind, PropertyValue, Result, SemanticCategory, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Concrete parameter assignment, keyed by parameter name
pub type ParameterValues = BTreeMap<String, f64>;

/// Closed real interval `[min, max]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Create a new interval
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Interval containing a single value
    pub const fn point(v: f64) -> Self {
        Self { min: v, max: v }
    }

    /// Unbounded interval
    pub const fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Check if a value lies inside (NaN is never inside)
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    /// Check if `other` lies entirely inside this interval
    pub fn contains_interval(&self, other: &Interval) -> bool {
        other.min >= self.min && other.max <= self.max
    }

    /// Intersection, or `None` when disjoint
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(Interval { min, max })
    }

    /// Clamp a value into the interval
    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }

    /// Midpoint
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) * 0.5
    }

    /// Width of the interval
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Check both ends are finite and ordered
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Numeric kind of a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Real,
    Integer,
}

/// One entry of a template's parameter schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    /// Range seen across the source elements
    pub observed: Interval,
    /// Declared domain (always contains `observed`)
    pub domain: Interval,
    pub default: f64,
}

impl ParameterSpec {
    /// Real-valued parameter
    pub fn real(name: impl Into<String>, observed: Interval, domain: Interval, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Real,
            observed,
            domain,
            default,
        }
    }

    /// Integer-valued parameter
    pub fn integer(name: impl Into<String>, observed: Interval, domain: Interval, default: f64) -> Self {
        Self {
            kind: ParameterKind::Integer,
            ..Self::real(name, observed, domain, default)
        }
    }

    /// Check a value against kind and domain
    pub fn admits(&self, value: f64) -> bool {
        self.domain.contains(value)
            && (self.kind == ParameterKind::Real || value.fract() == 0.0)
    }
}

/// Source of a generated dimension
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Value of a schema parameter
    Parameter(String),
    /// Fixed value
    Constant(f64),
}

impl Binding {
    /// Evaluate against a parameter assignment
    pub fn evaluate(&self, values: &ParameterValues) -> Option<f64> {
        match self {
            Binding::Parameter(name) => values.get(name).copied(),
            Binding::Constant(v) => Some(*v),
        }
    }

    /// Parameter name, if bound to one
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Binding::Parameter(name) => Some(name),
            Binding::Constant(_) => None,
        }
    }
}

/// Source of a derived property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedProperty {
    /// Invariant value shared by every source element
    Constant(PropertyValue),
    /// Value of a schema parameter
    Parameter(String),
}

/// Generative rule: parameter values → descriptor + derived properties
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerativeRule {
    pub category: SemanticCategory,
    pub profile: ProfileKind,
    /// Unit principal axis direction of generated instances
    pub direction: [f64; 3],
    /// Unit major section direction of generated instances
    pub reference: [f64; 3],
    pub length: Binding,
    pub depth: Binding,
    pub width: Binding,
    /// Section area divided by depth × width
    pub fill_ratio: f64,
    /// Normalized section area samples along the axis
    pub stations: Vec<f64>,
    pub properties: BTreeMap<String, DerivedProperty>,
}

impl GenerativeRule {
    /// Every parameter name the rule reads
    pub fn referenced_parameters(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = [&self.length, &self.depth, &self.width]
            .into_iter()
            .filter_map(|b| b.parameter())
            .collect();
        for derived in self.properties.values() {
            if let DerivedProperty::Parameter(name) = derived {
                names.insert(name);
            }
        }
        names
    }
}

/// A recognized family with its parameter schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParametricTemplate {
    pub id: TemplateId,
    pub category: SemanticCategory,
    /// Ordered parameter schema
    pub schema: Vec<ParameterSpec>,
    pub rule: GenerativeRule,
    /// Source elements the template was derived from
    pub provenance: BTreeSet<ElementId>,
}

impl ParametricTemplate {
    /// Look up a schema entry
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.schema.iter().find(|p| p.name == name)
    }

    /// Default value for every parameter
    pub fn defaults(&self) -> ParameterValues {
        self.schema
            .iter()
            .map(|p| (p.name.clone(), p.default))
            .collect()
    }

    /// Check the template invariants
    ///
    /// Parameter names must be unique, domains finite and ordered, observed
    /// ranges and defaults inside their domains, and the set of parameters the
    /// rule references must equal the schema.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Err(ModelError::schema(&self.id, reason));

        if self.id.as_str().is_empty() {
            return fail("empty template id".to_string());
        }
        if self.rule.category != self.category {
            return fail(format!(
                "rule category '{}' differs from template category '{}'",
                self.rule.category, self.category
            ));
        }

        let mut names = BTreeSet::new();
        for spec in &self.schema {
            if spec.name.is_empty() {
                return fail("parameter with empty name".to_string());
            }
            if !names.insert(spec.name.as_str()) {
                return fail(format!("duplicate parameter '{}'", spec.name));
            }
            if !spec.domain.is_valid() {
                return fail(format!("parameter '{}' has invalid domain {}", spec.name, spec.domain));
            }
            if !spec.observed.is_valid() || !spec.domain.contains_interval(&spec.observed) {
                return fail(format!(
                    "parameter '{}' observed range {} outside domain {}",
                    spec.name, spec.observed, spec.domain
                ));
            }
            if !spec.admits(spec.default) {
                return fail(format!(
                    "parameter '{}' default {} not admitted by domain {}",
                    spec.name, spec.default, spec.domain
                ));
            }
        }

        let referenced = self.rule.referenced_parameters();
        if let Some(name) = names.difference(&referenced).next() {
            return fail(format!("parameter '{}' is not referenced by the rule", name));
        }
        if let Some(name) = referenced.difference(&names).next() {
            return fail(format!("rule references undeclared parameter '{}'", name));
        }

        for binding in [&self.rule.length, &self.rule.depth, &self.rule.width] {
            if let Binding::Constant(v) = binding {
                if !v.is_finite() || *v < 0.0 {
                    return fail(format!("rule constant {} is not a valid extent", v));
                }
            }
        }
        let norm = self.rule.direction.iter().map(|c| c * c).sum::<f64>();
        if !norm.is_finite() || norm < 1e-12 {
            return fail("rule direction is degenerate".to_string());
        }
        if !self.rule.fill_ratio.is_finite() || self.rule.fill_ratio <= 0.0 {
            return fail(format!("invalid fill ratio {}", self.rule.fill_ratio));
        }
        Ok(())
    }

    /// Check a complete assignment against the schema
    pub fn check_values(&self, values: &ParameterValues) -> Result<()> {
        if let Some(name) = values.keys().find(|n| self.parameter(n).is_none()) {
            return Err(ModelError::UnknownParameter(name.clone()));
        }
        for spec in &self.schema {
            let value = values
                .get(&spec.name)
                .copied()
                .ok_or_else(|| ModelError::MissingParameter(spec.name.clone()))?;
            if !spec.admits(value) {
                return Err(ModelError::domain(&spec.name, value, spec.domain));
            }
        }
        Ok(())
    }
}

/// Reference to one stored version of a template
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub id: TemplateId,
    /// Version number, starting at 1
    pub version: u32,
}

impl TemplateRef {
    /// Create a new reference
    pub fn new(id: impl Into<TemplateId>, version: u32) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.id, self.version)
    }
}

/// A template together with the version it was read at
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedTemplate {
    pub reference: TemplateRef,
    pub template: Arc<ParametricTemplate>,
}
