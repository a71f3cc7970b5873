// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feature signatures and the distance between them

use crate::options::RecognizerOptions;
use bimparam_model::{NormalizedElement, ProfileKind};

/// Value of a key property in the categorical part of a signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyValue {
    Missing,
    /// Compared by value through the numeric part
    Numeric,
    Text(String),
}

/// Feature vector of one element, or the centroid of a cluster
///
/// Elements with different categorical parts are never similar.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub profile: ProfileKind,
    pub keys: Vec<KeyValue>,
    /// Principal extents, longest first
    pub dimensions: [f64; 3],
    pub fill_ratio: f64,
    /// Normalized section samples along the axis
    pub stations: Vec<f64>,
    /// Numeric key property values, aligned with `keys`
    pub numeric: Vec<Option<f64>>,
}

impl Signature {
    /// Signature of an element; `None` without a descriptor
    pub fn of(element: &NormalizedElement, options: &RecognizerOptions) -> Option<Self> {
        let descriptor = element.descriptor.as_ref()?;
        let (profile, fill_ratio, stations) = match &descriptor.section {
            Some(section) => (section.kind, section.fill_ratio, section.stations.clone()),
            None => (ProfileKind::Rectangle, 1.0, Vec::new()),
        };

        let mut keys = Vec::with_capacity(options.key_properties.len());
        let mut numeric = Vec::with_capacity(options.key_properties.len());
        for name in &options.key_properties {
            match element.property(name) {
                None => {
                    keys.push(KeyValue::Missing);
                    numeric.push(None);
                }
                Some(value) if value.is_numeric() => {
                    keys.push(KeyValue::Numeric);
                    numeric.push(value.as_f64());
                }
                Some(value) => {
                    keys.push(KeyValue::Text(value.to_string()));
                    numeric.push(None);
                }
            }
        }

        Some(Self {
            profile,
            keys,
            dimensions: descriptor.dimensions(),
            fill_ratio,
            stations,
            numeric,
        })
    }

    /// Check if the categorical parts agree
    pub fn compatible(&self, other: &Signature) -> bool {
        self.profile == other.profile
            && self.keys == other.keys
            && self.stations.len() == other.stations.len()
    }

    /// Mean of compatible signatures, in the given order
    ///
    /// Returns `None` for an empty slice.
    pub fn centroid(members: &[&Signature]) -> Option<Signature> {
        let first = members.first()?;
        let n = members.len() as f64;
        let mut centroid = Signature {
            profile: first.profile,
            keys: first.keys.clone(),
            dimensions: [0.0; 3],
            fill_ratio: 0.0,
            stations: vec![0.0; first.stations.len()],
            numeric: first.numeric.iter().map(|v| v.map(|_| 0.0)).collect(),
        };
        for member in members {
            for (acc, v) in centroid.dimensions.iter_mut().zip(member.dimensions) {
                *acc += v / n;
            }
            centroid.fill_ratio += member.fill_ratio / n;
            for (acc, v) in centroid.stations.iter_mut().zip(&member.stations) {
                *acc += v / n;
            }
            for (acc, v) in centroid.numeric.iter_mut().zip(&member.numeric) {
                if let (Some(acc), Some(v)) = (acc.as_mut(), v) {
                    *acc += v / n;
                }
            }
        }
        Some(centroid)
    }

    /// Weighted distance in `[0, 1]`, or infinity across categorical parts
    pub fn distance(&self, other: &Signature, options: &RecognizerOptions) -> f64 {
        if !self.compatible(other) {
            return f64::INFINITY;
        }

        let dimension = self
            .dimensions
            .iter()
            .zip(other.dimensions)
            .map(|(a, b)| relative_difference(*a, b))
            .chain(self.numeric.iter().zip(&other.numeric).map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => relative_difference(*a, *b),
                (None, None) => 0.0,
                _ => 1.0,
            }))
            .fold(0.0, f64::max);

        let station = if self.stations.is_empty() {
            0.0
        } else {
            self.stations
                .iter()
                .zip(&other.stations)
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / self.stations.len() as f64
        };
        let shape = ((station + (self.fill_ratio - other.fill_ratio).abs()) * 0.5).min(1.0);

        let total = options.shape_weight + options.dimension_weight;
        (options.shape_weight * shape + options.dimension_weight * dimension) / total
    }
}

/// `|a - b| / max(|a|, |b|)`, zero when both vanish
fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale < 1e-12 {
        0.0
    } else {
        ((a - b).abs() / scale).min(1.0)
    }
}
