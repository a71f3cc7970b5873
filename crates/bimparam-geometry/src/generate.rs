// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Evaluation of generative rules

use crate::error::{Error, Result};
use crate::frame::{oriented_bounds, to_point, to_vector, Frame};
use bimparam_model::{
    Binding, DerivedProperty, GeometricDescriptor, ParameterKind, ParameterValues,
    ParametricTemplate, Placement, PropertyMap, PropertyValue, SectionProfile,
};

/// Geometry and properties produced by a rule
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedShape {
    pub descriptor: GeometricDescriptor,
    pub properties: PropertyMap,
}

fn extent(binding: &Binding, values: &ParameterValues) -> Result<f64> {
    let value = binding.evaluate(values).ok_or_else(|| {
        Error::UnboundParameter(binding.parameter().unwrap_or_default().to_string())
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(format!("generated extent {} is not valid", value)));
    }
    Ok(value)
}

/// Evaluate a template's rule at a parameter assignment
///
/// The instance starts at the placement origin and runs along the rule
/// direction; its section is centered on the axis. The result depends only
/// on the inputs.
pub fn generate(
    template: &ParametricTemplate,
    values: &ParameterValues,
    placement: &Placement,
) -> Result<GeneratedShape> {
    let rule = &template.rule;
    let length = extent(&rule.length, values)?;
    let depth = extent(&rule.depth, values)?;
    let width = extent(&rule.width, values)?;

    let frame = Frame::new(to_vector(rule.direction), Some(to_vector(rule.reference)))?;
    let origin = to_point(placement.origin);
    let bounds = oriented_bounds(
        origin,
        &frame,
        [
            (0.0, length),
            (-depth / 2.0, depth / 2.0),
            (-width / 2.0, width / 2.0),
        ],
    );
    let center = origin + frame.direction * (length / 2.0);

    let descriptor = GeometricDescriptor {
        bounds,
        axis: frame.to_principal_axis(center),
        length,
        depth,
        width,
        section: Some(SectionProfile {
            kind: rule.profile,
            area: rule.fill_ratio * depth * width,
            fill_ratio: rule.fill_ratio,
            stations: rule.stations.clone(),
        }),
    };

    let mut properties = PropertyMap::new();
    for (name, derived) in &rule.properties {
        let value = match derived {
            DerivedProperty::Constant(v) => v.clone(),
            DerivedProperty::Parameter(p) => {
                let v = values
                    .get(p)
                    .copied()
                    .ok_or_else(|| Error::UnboundParameter(p.clone()))?;
                match template.parameter(p).map(|s| s.kind) {
                    Some(ParameterKind::Integer) => PropertyValue::Integer(v.round() as i64),
                    _ => PropertyValue::Real(v),
                }
            }
        };
        properties.insert(name.clone(), value);
    }

    Ok(GeneratedShape {
        descriptor,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bimparam_model::{
        ElementId, GenerativeRule, Interval, ParameterSpec, ProfileKind, SemanticCategory,
        TemplateId,
    };
    use std::collections::BTreeMap;

    fn beam_template() -> ParametricTemplate {
        let mut properties = BTreeMap::new();
        properties.insert(
            "Material".to_string(),
            DerivedProperty::Constant(PropertyValue::from("steel")),
        );
        properties.insert(
            "BoltCount".to_string(),
            DerivedProperty::Parameter("bolts".to_string()),
        );
        ParametricTemplate {
            id: TemplateId::new("beam-001"),
            category: SemanticCategory::Beam,
            schema: vec![
                ParameterSpec::real("span", Interval::new(5.0, 6.0), Interval::new(2.5, 12.0), 5.5),
                ParameterSpec::integer("bolts", Interval::new(4.0, 8.0), Interval::new(2.0, 16.0), 6.0),
            ],
            rule: GenerativeRule {
                category: SemanticCategory::Beam,
                profile: ProfileKind::IShape,
                direction: [1.0, 0.0, 0.0],
                reference: [0.0, 0.0, 1.0],
                length: Binding::Parameter("span".to_string()),
                depth: Binding::Constant(0.4),
                width: Binding::Constant(0.2),
                fill_ratio: 0.3,
                stations: vec![1.0; 3],
                properties,
            },
            provenance: [ElementId::from("B1")].into_iter().collect(),
        }
    }

    #[test]
    fn test_generate_beam() {
        let template = beam_template();
        let mut values = template.defaults();
        values.insert("span".to_string(), 6.0);

        let shape = generate(&template, &values, &Placement::at(0.0, 0.0, 3.0)).unwrap();
        let d = &shape.descriptor;
        assert_relative_eq!(d.length, 6.0);
        assert_relative_eq!(d.bounds.max[0], 6.0, epsilon = 1e-12);
        assert_relative_eq!(d.bounds.min[2], 2.8, epsilon = 1e-12);
        assert_relative_eq!(d.bounds.max[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(d.section.as_ref().unwrap().area, 0.024, epsilon = 1e-12);

        assert_eq!(shape.properties["Material"], PropertyValue::from("steel"));
        assert_eq!(shape.properties["BoltCount"], PropertyValue::Integer(6));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let template = beam_template();
        let values = template.defaults();
        let a = generate(&template, &values, &Placement::default()).unwrap();
        let b = generate(&template, &values, &Placement::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_value() {
        let template = beam_template();
        assert_eq!(
            generate(&template, &ParameterValues::new(), &Placement::default()),
            Err(Error::UnboundParameter("span".to_string()))
        );
    }
}
