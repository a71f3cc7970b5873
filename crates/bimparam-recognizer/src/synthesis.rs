// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Template synthesis from a cluster of similar elements
//!
//! Every feature of the cluster is either invariant (variance within the
//! invariance epsilon) and becomes a constant of the generative rule, or it
//! varies and becomes a named parameter with its observed range, an
//! expanded domain and the cluster mean as default.

use crate::options::RecognizerOptions;
use bimparam_model::{
    Binding, DerivedProperty, GenerativeRule, Interval, ModelError, NormalizedElement,
    ParameterKind, ParameterSpec, ParameterValues, ParametricTemplate, ProfileKind, PropertyValue,
    Result, SemanticCategory, TemplateId,
};
use std::collections::BTreeMap;

/// Name of the parameter shared by both section extents of round members
pub const DIAMETER: &str = "diameter";

struct Stats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

impl Stats {
    fn of(values: &[f64]) -> Stats {
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Stats {
            min,
            max,
            mean,
            variance,
        }
    }
}

/// Accumulates the parameter schema while features are fitted
struct SchemaBuilder<'a> {
    options: &'a RecognizerOptions,
    schema: Vec<ParameterSpec>,
}

impl SchemaBuilder<'_> {
    fn has(&self, name: &str) -> bool {
        self.schema.iter().any(|p| p.name == name)
    }

    /// Fit a non-negative geometric extent
    fn extent(&mut self, name: &str, values: &[f64]) -> Binding {
        let stats = Stats::of(values);
        if stats.variance <= self.options.invariance_epsilon {
            return Binding::Constant(stats.mean);
        }
        let f = self.options.domain_expansion;
        let domain = Interval::new((stats.min / f).max(0.0), stats.max * f);
        self.schema.push(ParameterSpec::real(
            name,
            Interval::new(stats.min, stats.max),
            domain,
            stats.mean,
        ));
        Binding::Parameter(name.to_string())
    }

    /// Fit a numeric property that may take any sign
    fn property(&mut self, name: &str, values: &[f64], kind: ParameterKind) {
        let stats = Stats::of(values);
        let f = self.options.domain_expansion;
        let observed = Interval::new(stats.min, stats.max);
        let mut domain = if stats.min > 0.0 {
            Interval::new(stats.min / f, stats.max * f)
        } else {
            let margin = (stats.max - stats.min) * (f - 1.0);
            Interval::new(stats.min - margin, stats.max + margin)
        };
        let spec = match kind {
            ParameterKind::Real => ParameterSpec::real(name, observed, domain, stats.mean),
            ParameterKind::Integer => {
                domain = Interval::new(domain.min.floor(), domain.max.ceil());
                let default = observed.clamp(stats.mean.round());
                ParameterSpec::integer(name, observed, domain, default)
            }
        };
        self.schema.push(spec);
    }
}

/// Build a template from the members of one cluster
///
/// # Arguments
/// * `id` - Identity of the new template
/// * `category` - Category shared by all members
/// * `members` - Members ordered by id, all with a geometric descriptor
/// * `options` - Invariance epsilon and domain expansion
///
/// # Returns
/// A template that passes [`ParametricTemplate::validate`]
pub fn synthesize(
    id: TemplateId,
    category: SemanticCategory,
    members: &[&NormalizedElement],
    options: &RecognizerOptions,
) -> Result<ParametricTemplate> {
    let descriptors: Vec<_> = members.iter().filter_map(|m| m.descriptor.as_ref()).collect();
    let Some(first) = descriptors.first() else {
        return Err(ModelError::schema(&id, "cluster has no geometry"));
    };

    let profile = first
        .section
        .as_ref()
        .map(|s| s.kind)
        .unwrap_or(ProfileKind::Rectangle);
    let names = category.dimension_names();
    let mut builder = SchemaBuilder {
        options,
        schema: Vec::new(),
    };

    let lengths: Vec<f64> = descriptors.iter().map(|d| d.length).collect();
    let length = builder.extent(names[0], &lengths);
    let (depth, width) = if profile == ProfileKind::Circle {
        let diameters: Vec<f64> = descriptors.iter().map(|d| (d.depth + d.width) * 0.5).collect();
        let diameter = builder.extent(DIAMETER, &diameters);
        (diameter.clone(), diameter)
    } else {
        let depths: Vec<f64> = descriptors.iter().map(|d| d.depth).collect();
        let widths: Vec<f64> = descriptors.iter().map(|d| d.width).collect();
        (builder.extent(names[1], &depths), builder.extent(names[2], &widths))
    };

    let n = descriptors.len() as f64;
    let fill_ratio = descriptors
        .iter()
        .map(|d| d.section.as_ref().map_or(1.0, |s| s.fill_ratio))
        .sum::<f64>()
        / n;
    let station_count = first.section.as_ref().map_or(0, |s| s.stations.len());
    let mut stations = vec![0.0; station_count];
    for d in &descriptors {
        if let Some(section) = &d.section {
            for (acc, v) in stations.iter_mut().zip(&section.stations) {
                *acc += v / n;
            }
        }
    }

    let properties = derive_properties(members, &mut builder);

    let template = ParametricTemplate {
        id,
        category,
        schema: builder.schema,
        rule: GenerativeRule {
            category,
            profile,
            direction: first.axis.direction,
            reference: first.axis.reference,
            length,
            depth,
            width,
            fill_ratio,
            stations,
            properties,
        },
        provenance: members.iter().map(|m| m.id.clone()).collect(),
    };
    template.validate()?;
    Ok(template)
}

/// Properties shared by all members: equal values become constants, varying
/// numeric values become parameters, anything else is dropped
fn derive_properties(
    members: &[&NormalizedElement],
    builder: &mut SchemaBuilder<'_>,
) -> BTreeMap<String, DerivedProperty> {
    let mut derived = BTreeMap::new();
    let Some(first) = members.first() else {
        return derived;
    };

    for (name, value) in &first.properties {
        let values: Vec<&PropertyValue> = members
            .iter()
            .filter_map(|m| m.properties.get(name))
            .collect();
        if values.len() != members.len() {
            continue;
        }
        if values.iter().all(|v| *v == value) {
            derived.insert(name.clone(), DerivedProperty::Constant(value.clone()));
            continue;
        }
        if !values.iter().all(|v| v.is_numeric()) {
            log::debug!("Dropping varying non-numeric property '{}'", name);
            continue;
        }

        let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
        let integer = values.iter().all(|v| matches!(v, PropertyValue::Integer(_)));
        let stats = Stats::of(&numbers);
        if !integer && stats.variance <= builder.options.invariance_epsilon {
            derived.insert(
                name.clone(),
                DerivedProperty::Constant(PropertyValue::Real(stats.mean)),
            );
            continue;
        }

        let parameter = if builder.has(name) {
            format!("{}_property", name)
        } else {
            name.clone()
        };
        let kind = if integer {
            ParameterKind::Integer
        } else {
            ParameterKind::Real
        };
        builder.property(&parameter, &numbers, kind);
        derived.insert(name.clone(), DerivedProperty::Parameter(parameter));
    }
    derived
}

/// Parameter values that reproduce an element under a template
///
/// Extents are read from the element's descriptor and property parameters
/// from its properties. Parameters the element cannot supply keep their
/// defaults. Values are not clamped, so an element outside the family may
/// yield values outside the declared domains.
pub fn parameters_of(template: &ParametricTemplate, element: &NormalizedElement) -> ParameterValues {
    let mut values = template.defaults();

    if let Some(descriptor) = &element.descriptor {
        let rule = &template.rule;
        let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (binding, value) in [&rule.length, &rule.depth, &rule.width]
            .into_iter()
            .zip(descriptor.dimensions())
        {
            if let Some(name) = binding.parameter() {
                samples.entry(name).or_default().push(value);
            }
        }
        for (name, list) in samples {
            values.insert(name.to_string(), list.iter().sum::<f64>() / list.len() as f64);
        }
    }

    for (property, derived) in &template.rule.properties {
        if let DerivedProperty::Parameter(name) = derived {
            if let Some(v) = element.property(property).and_then(PropertyValue::as_f64) {
                values.insert(name.clone(), v);
            }
        }
    }
    values
}
