// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Displacement between two element groups, storey by storey
//!
//! Two exports of the same building (architecture and structure, two
//! phases of one model) often sit in different coordinate systems. Each
//! group is reduced to one reference point per storey, the lower corner of
//! the storey's bounds. Storeys are matched by name, and the displacement
//! that moves the second group onto the first is read from the match with
//! the smallest vertical gap.

use crate::error::{Error, Result};
use bimparam_model::{BoundingBox, NormalizedElement};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Alignment options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentOptions {
    /// Largest spread of vertical gaps over matched storeys for the
    /// displacement to hold for the whole group, in meters
    pub consistency_tolerance: f64,
    /// Displacement component below which an axis is already aligned
    pub significant_shift: f64,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            consistency_tolerance: 5.0,
            significant_shift: 1.0,
        }
    }
}

impl AlignmentOptions {
    /// Check tolerances are finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("consistency tolerance", self.consistency_tolerance),
            ("significant shift", self.significant_shift),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::alignment(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Reference point of one storey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreyReference {
    /// Storey name, see [`storey_key`]
    pub storey: String,
    /// Lower corner of the storey's bounds
    pub origin: [f64; 3],
}

/// Storey name used for matching
///
/// Keeps the last `/` segment and drops a numeric duplicate suffix, so
/// `IfcBuildingStorey/NIVEAU 1.001` and `NIVEAU 1` match.
pub fn storey_key(name: &str) -> String {
    let name = name.rsplit('/').next().unwrap_or(name);
    let name = match name.rsplit_once('.') {
        Some((head, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            head
        }
        _ => name,
    };
    name.trim().to_string()
}

/// One reference point per storey, lowest first
///
/// Elements without a storey or without geometry are skipped.
pub fn storey_references(elements: &[NormalizedElement]) -> Vec<StoreyReference> {
    let mut bounds: BTreeMap<String, BoundingBox> = BTreeMap::new();
    for element in elements {
        let (Some(storey), Some(descriptor)) = (&element.storey, &element.descriptor) else {
            continue;
        };
        if !descriptor.bounds.is_finite() {
            continue;
        }
        bounds
            .entry(storey_key(storey))
            .and_modify(|b| *b = b.union(&descriptor.bounds))
            .or_insert(descriptor.bounds);
    }

    let mut references: Vec<StoreyReference> = bounds
        .into_iter()
        .map(|(storey, b)| StoreyReference { storey, origin: b.min })
        .collect();
    references.sort_by(|a, b| a.origin[2].total_cmp(&b.origin[2]).then_with(|| a.storey.cmp(&b.storey)));
    references
}

/// A storey found in both groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreyMatch {
    pub storey: String,
    /// Reference point in the fixed group
    pub fixed: [f64; 3],
    /// Reference point in the group to move
    pub moved: [f64; 3],
    /// `fixed - moved`
    pub displacement: [f64; 3],
}

impl StoreyMatch {
    /// Height difference between the two reference points
    pub fn vertical_gap(&self) -> f64 {
        self.displacement[2].abs()
    }

    /// Distance between the two reference points
    pub fn distance(&self) -> f64 {
        Vector3::from(self.displacement).norm()
    }
}

/// Result of aligning one group onto another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAlignment {
    /// Matched storeys, smallest vertical gap first
    pub matches: Vec<StoreyMatch>,
    /// Storeys of the fixed group with no counterpart
    pub unmatched_fixed: Vec<String>,
    /// Storeys of the moved group with no counterpart
    pub unmatched_moved: Vec<String>,
    /// Displacement to apply to the moved group
    pub recommended: [f64; 3],
    /// Largest minus smallest vertical gap over the matches
    pub spread: f64,
    /// Spread is within the consistency tolerance
    pub consistent: bool,
    /// Axes whose displacement exceeds the significant shift
    pub significant: [bool; 3],
}

impl GroupAlignment {
    /// Match the recommendation was read from
    pub fn primary(&self) -> Option<&StoreyMatch> {
        self.matches.first()
    }

    /// Check if the groups already coincide on every axis
    pub fn is_aligned(&self) -> bool {
        !self.significant.iter().any(|s| *s)
    }

    /// Bounds of the moved group once displaced
    pub fn apply(&self, bounds: &BoundingBox) -> BoundingBox {
        bounds.translated(self.recommended)
    }
}

/// Displacement bringing `moved` onto `fixed`
///
/// Fails when either group has no storey reference or the groups share no
/// storey name.
pub fn align_groups(
    fixed: &[NormalizedElement],
    moved: &[NormalizedElement],
    options: &AlignmentOptions,
) -> Result<GroupAlignment> {
    options.validate()?;
    let fixed_refs = storey_references(fixed);
    let moved_refs = storey_references(moved);
    if fixed_refs.is_empty() {
        return Err(Error::alignment("fixed group has no storey with geometry"));
    }
    if moved_refs.is_empty() {
        return Err(Error::alignment("moved group has no storey with geometry"));
    }

    let moved_by_name: BTreeMap<&str, &StoreyReference> =
        moved_refs.iter().map(|r| (r.storey.as_str(), r)).collect();

    let mut matches = Vec::new();
    let mut unmatched_fixed = Vec::new();
    for reference in &fixed_refs {
        let Some(other) = moved_by_name.get(reference.storey.as_str()) else {
            unmatched_fixed.push(reference.storey.clone());
            continue;
        };
        let displacement = Vector3::from(reference.origin) - Vector3::from(other.origin);
        matches.push(StoreyMatch {
            storey: reference.storey.clone(),
            fixed: reference.origin,
            moved: other.origin,
            displacement: displacement.into(),
        });
    }
    let unmatched_moved = moved_refs
        .iter()
        .filter(|r| !fixed_refs.iter().any(|f| f.storey == r.storey))
        .map(|r| r.storey.clone())
        .collect();

    if matches.is_empty() {
        return Err(Error::alignment("groups share no storey"));
    }
    matches.sort_by(|a, b| {
        a.vertical_gap()
            .total_cmp(&b.vertical_gap())
            .then_with(|| a.storey.cmp(&b.storey))
    });

    let recommended = matches[0].displacement;
    let (low, high) = matches.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), m| {
        (lo.min(m.vertical_gap()), hi.max(m.vertical_gap()))
    });
    let spread = high - low;
    let consistent = spread <= options.consistency_tolerance;
    let significant = recommended.map(|d| d.abs() > options.significant_shift);

    if !consistent {
        log::warn!(
            "Storey gaps differ by {:.2} m; the displacement from {} may not hold for every storey",
            spread,
            matches[0].storey
        );
    }
    log::debug!(
        "Aligned on {} storeys, displacement [{:.3}, {:.3}, {:.3}]",
        matches.len(),
        recommended[0],
        recommended[1],
        recommended[2]
    );

    Ok(GroupAlignment {
        matches,
        unmatched_fixed,
        unmatched_moved,
        recommended,
        spread,
        consistent,
        significant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bimparam_model::{
        ElementId, GeometricDescriptor, PrincipalAxis, PropertyMap, SemanticCategory, ShapeRecord,
    };
    use std::collections::BTreeSet;

    fn slab(id: &str, storey: Option<&str>, min: [f64; 3]) -> NormalizedElement {
        let bounds = BoundingBox::new(min, [min[0] + 10.0, min[1] + 8.0, min[2] + 0.3]);
        let descriptor = GeometricDescriptor {
            bounds,
            axis: PrincipalAxis::default(),
            length: 10.0,
            depth: 8.0,
            width: 0.3,
            section: None,
        };
        NormalizedElement {
            id: ElementId::new(id),
            category: SemanticCategory::Slab,
            type_tag: "IfcSlab".to_string(),
            name: None,
            storey: storey.map(str::to_string),
            shape: ShapeRecord::from_descriptor(SemanticCategory::Slab, "IfcSlab", &descriptor),
            descriptor: Some(descriptor),
            properties: PropertyMap::new(),
            relations: BTreeSet::new(),
        }
    }

    fn building(offset: [f64; 3], suffix: &str) -> Vec<NormalizedElement> {
        (0..3)
            .map(|level| {
                let z = level as f64 * 3.5;
                slab(
                    &format!("S{}", level),
                    Some(&format!("NIVEAU {}{}", level, suffix)),
                    [offset[0], offset[1], offset[2] + z],
                )
            })
            .collect()
    }

    #[test]
    fn test_storey_key() {
        assert_eq!(storey_key("IfcBuildingStorey/NIVEAU 1.001"), "NIVEAU 1");
        assert_eq!(storey_key("NIVEAU 1"), "NIVEAU 1");
        assert_eq!(storey_key("Level 2.5a"), "Level 2.5a");
        assert_eq!(storey_key(" RDC "), "RDC");
    }

    #[test]
    fn test_storey_references_lowest_first() {
        let mut elements = building([0.0, 0.0, 0.0], "");
        elements.push(slab("S9", None, [0.0, 0.0, -20.0]));
        elements.push(slab("S1b", Some("NIVEAU 1.002"), [-2.0, 1.0, 3.2]));

        let references = storey_references(&elements);
        let names: Vec<&str> = references.iter().map(|r| r.storey.as_str()).collect();
        assert_eq!(names, vec!["NIVEAU 0", "NIVEAU 1", "NIVEAU 2"]);
        assert_eq!(references[1].origin, [-2.0, 0.0, 3.2]);
    }

    #[test]
    fn test_translated_group() {
        let fixed = building([0.0, 0.0, 0.0], "");
        let moved = building([120.0, -40.0, 12.0], ".001");

        let alignment = align_groups(&fixed, &moved, &AlignmentOptions::default()).unwrap();
        assert_eq!(alignment.matches.len(), 3);
        assert_eq!(alignment.recommended, [-120.0, 40.0, -12.0]);
        assert_relative_eq!(alignment.spread, 0.0, epsilon = 1e-9);
        assert!(alignment.consistent);
        assert_eq!(alignment.significant, [true, true, true]);
        assert!(!alignment.is_aligned());

        let placed = alignment.apply(&moved[1].descriptor.as_ref().unwrap().bounds);
        assert_relative_eq!(placed.min[2], 3.5, epsilon = 1e-9);
        let expected = (120.0f64 * 120.0 + 40.0 * 40.0 + 12.0 * 12.0).sqrt();
        assert_relative_eq!(alignment.primary().unwrap().distance(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_primary_is_smallest_vertical_gap() {
        let fixed = building([0.0, 0.0, 0.0], "");
        // storey heights differ: gaps 0.5, 1.0, 1.5
        let moved: Vec<NormalizedElement> = (0..3)
            .map(|level| {
                let z = level as f64 * 3.0 - 0.5;
                slab(&format!("M{}", level), Some(&format!("NIVEAU {}", level)), [0.2, 0.0, z])
            })
            .collect();

        let alignment = align_groups(&fixed, &moved, &AlignmentOptions::default()).unwrap();
        assert_eq!(alignment.primary().unwrap().storey, "NIVEAU 0");
        assert_relative_eq!(alignment.recommended[2], 0.5, epsilon = 1e-9);
        assert_relative_eq!(alignment.spread, 1.0, epsilon = 1e-9);
        assert!(alignment.consistent);
        assert_eq!(alignment.significant, [false, false, false]);
        assert!(alignment.is_aligned());

        let strict = AlignmentOptions {
            consistency_tolerance: 0.5,
            ..Default::default()
        };
        assert!(!align_groups(&fixed, &moved, &strict).unwrap().consistent);
    }

    #[test]
    fn test_unmatched_storeys() {
        let fixed = building([0.0, 0.0, 0.0], "");
        let mut moved = building([5.0, 0.0, 0.0], "");
        moved.remove(2);
        moved.push(slab("R1", Some("TOITURE"), [5.0, 0.0, 10.5]));

        let alignment = align_groups(&fixed, &moved, &AlignmentOptions::default()).unwrap();
        assert_eq!(alignment.matches.len(), 2);
        assert_eq!(alignment.unmatched_fixed, vec!["NIVEAU 2".to_string()]);
        assert_eq!(alignment.unmatched_moved, vec!["TOITURE".to_string()]);
        assert_eq!(alignment.recommended, [-5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nothing_to_align_on() {
        let fixed = building([0.0, 0.0, 0.0], "");
        let elsewhere = vec![slab("X1", Some("LEVEL A"), [0.0, 0.0, 0.0])];
        let unplaced = vec![slab("X2", None, [0.0, 0.0, 0.0])];
        let options = AlignmentOptions::default();

        assert!(matches!(
            align_groups(&fixed, &elsewhere, &options),
            Err(Error::Alignment(_))
        ));
        assert!(matches!(
            align_groups(&fixed, &unplaced, &options),
            Err(Error::Alignment(_))
        ));
        assert!(matches!(
            align_groups(&[], &fixed, &options),
            Err(Error::Alignment(_))
        ));

        let negative = AlignmentOptions {
            significant_shift: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }
}
