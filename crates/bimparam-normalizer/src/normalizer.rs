// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw records to normalized elements

use crate::category::CategoryTable;
use crate::error::{NormalizeError, NormalizerWarning, Result};
use bimparam_geometry::reduce_shape;
use bimparam_model::{
    collect_properties, ElementId, ElementSource, NormalizedElement, ProgressCallback,
    RawElement, RelationRef, SemanticCategory, ShapeRecord,
};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalizer options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    /// Number of section samples along the principal axis
    pub station_count: usize,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self { station_count: 5 }
    }
}

impl NormalizerOptions {
    /// Coarse sampling for quick passes
    pub fn fast() -> Self {
        Self { station_count: 3 }
    }

    /// Dense sampling for tapered or varying sections
    pub fn detailed() -> Self {
        Self { station_count: 9 }
    }

    /// Set the station count
    pub fn with_station_count(mut self, station_count: usize) -> Self {
        self.station_count = station_count;
        self
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if self.station_count == 0 {
            return Err(NormalizeError::options("station count must be at least 1"));
        }
        Ok(())
    }
}

/// Result of normalizing one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Elements ordered by id
    pub elements: Vec<NormalizedElement>,
    /// Notices in element id order (duplicates first)
    pub warnings: Vec<NormalizerWarning>,
}

impl NormalizationReport {
    /// Elements of one category
    pub fn by_category(&self, category: SemanticCategory) -> impl Iterator<Item = &NormalizedElement> {
        self.elements.iter().filter(move |e| e.category == category)
    }

    /// Look up an element by id
    pub fn element(&self, id: &str) -> Option<&NormalizedElement> {
        self.elements
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.elements[i])
    }
}

/// Element normalizer
///
/// Resolves each record to exactly one category, reduces its geometry to a
/// canonical descriptor and checks its relations. Records are never dropped:
/// problems are reported as [`NormalizerWarning`]s.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    table: CategoryTable,
    options: NormalizerOptions,
}

impl Normalizer {
    /// Create a normalizer with the standard category table
    pub fn new(options: NormalizerOptions) -> Self {
        Self {
            table: CategoryTable::standard(),
            options,
        }
    }

    /// Use a custom category table
    pub fn with_table(mut self, table: CategoryTable) -> Self {
        self.table = table;
        self
    }

    /// Category table in use
    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Normalize every record of a source
    pub fn normalize(&self, source: &dyn ElementSource) -> Result<NormalizationReport> {
        self.normalize_with_progress(source, Box::new(|_, _| {}))
    }

    /// Normalize with progress reporting
    ///
    /// # Arguments
    /// * `source` - Raw records plus their unit scale
    /// * `on_progress` - Callback receiving (phase_name, percent_complete)
    pub fn normalize_with_progress(
        &self,
        source: &dyn ElementSource,
        on_progress: ProgressCallback,
    ) -> Result<NormalizationReport> {
        self.options.validate()?;
        let unit_scale = source.unit_scale();
        if !unit_scale.is_finite() || unit_scale <= 0.0 {
            return Err(NormalizeError::InvalidUnitScale(unit_scale));
        }

        on_progress("Collecting records", 0.0);
        let mut latest: FxHashMap<String, RawElement> = FxHashMap::default();
        let mut occurrences: FxHashMap<String, usize> = FxHashMap::default();
        for record in source.elements() {
            *occurrences.entry(record.id.clone()).or_default() += 1;
            latest.insert(record.id.clone(), record);
        }

        let mut warnings: Vec<NormalizerWarning> = Vec::new();
        let mut duplicates: Vec<(&String, &usize)> =
            occurrences.iter().filter(|(_, n)| **n > 1).collect();
        duplicates.sort();
        for (id, &n) in duplicates {
            warnings.push(NormalizerWarning::DuplicateElement {
                id: ElementId::new(id.as_str()),
                occurrences: n,
            });
        }

        let known: FxHashSet<&str> = latest.keys().map(String::as_str).collect();
        let mut records: Vec<&RawElement> = latest.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));

        on_progress("Reducing geometry", 30.0);
        let station_count = self.options.station_count;
        let normalized: Vec<(NormalizedElement, Vec<NormalizerWarning>)> = records
            .par_iter()
            .map(|record| self.normalize_record(record, unit_scale, station_count, &known))
            .collect();

        on_progress("Collecting results", 90.0);
        let mut elements = Vec::with_capacity(normalized.len());
        for (element, notices) in normalized {
            elements.push(element);
            warnings.extend(notices);
        }

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        log::info!(
            "Normalized {} elements ({} warnings, unit scale {})",
            elements.len(),
            warnings.len(),
            unit_scale
        );
        on_progress("Done", 100.0);

        Ok(NormalizationReport { elements, warnings })
    }

    fn normalize_record(
        &self,
        record: &RawElement,
        unit_scale: f64,
        station_count: usize,
        known: &FxHashSet<&str>,
    ) -> (NormalizedElement, Vec<NormalizerWarning>) {
        let id = ElementId::new(record.id.as_str());
        let mut warnings = Vec::new();

        let category = match self.table.classify(&record.type_tag, record.name.as_deref()) {
            Some(category) => category,
            None => {
                warnings.push(NormalizerWarning::UnclassifiedElement {
                    id: id.clone(),
                    type_tag: record.type_tag.clone(),
                });
                SemanticCategory::Unknown
            }
        };

        let descriptor = match reduce_shape(&record.shape, unit_scale, station_count) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warnings.push(NormalizerWarning::InvalidGeometry {
                    id: id.clone(),
                    message: e.to_string(),
                });
                None
            }
        };

        // Records without usable geometry have no shape to classify
        let shape = match &descriptor {
            Some(d) => ShapeRecord::from_descriptor(category, &record.type_tag, d),
            None => ShapeRecord::Unclassified {
                type_tag: record.type_tag.clone(),
            },
        };

        let mut relations = BTreeSet::new();
        for relation in &record.relations {
            if !known.contains(relation.target.as_str()) {
                warnings.push(NormalizerWarning::DanglingRelation {
                    id: id.clone(),
                    kind: relation.kind,
                    target: ElementId::new(relation.target.as_str()),
                });
            }
            relations.insert(RelationRef::new(relation.kind, relation.target.as_str()));
        }

        let element = NormalizedElement {
            id,
            category,
            type_tag: record.type_tag.clone(),
            name: record.name.clone(),
            storey: record.storey.clone(),
            descriptor,
            shape,
            properties: collect_properties(record.properties.iter().cloned()),
            relations,
        };
        (element, warnings)
    }
}
