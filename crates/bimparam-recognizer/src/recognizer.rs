// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element families to parametric templates

use crate::cluster::agglomerate;
use crate::error::Result;
use crate::options::RecognizerOptions;
use crate::signature::Signature;
use crate::synthesis::synthesize;
use bimparam_model::{
    ElementId, NormalizedElement, ParametricTemplate, ProgressCallback, SemanticCategory,
    TemplateId,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why an element did not become part of a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnclusteredReason {
    /// Its cluster had fewer members than the minimum support
    BelowSupport { cluster_size: usize },
    /// Unknown semantic category
    Unclassified,
    /// No geometric descriptor
    NoGeometry,
    /// The cluster could not be expressed as a valid template
    Unfittable { message: String },
}

/// An element left outside every template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unclustered {
    pub id: ElementId,
    pub category: SemanticCategory,
    #[serde(flatten)]
    pub reason: UnclusteredReason,
}

/// Result of a recognition pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    /// Templates ordered by id
    pub templates: Vec<ParametricTemplate>,
    /// Template each clustered element belongs to
    pub assignments: BTreeMap<ElementId, TemplateId>,
    /// Elements without a template, ordered by id
    pub unclustered: Vec<Unclustered>,
}

impl RecognitionOutcome {
    /// Look up a template by id
    pub fn template(&self, id: &str) -> Option<&ParametricTemplate> {
        self.templates.iter().find(|t| t.id.as_str() == id)
    }

    /// Template an element was assigned to
    pub fn template_of(&self, element: &str) -> Option<&ParametricTemplate> {
        let id = self.assignments.get(&ElementId::new(element))?;
        self.template(id.as_str())
    }

    /// Templates of one category
    pub fn by_category(&self, category: SemanticCategory) -> impl Iterator<Item = &ParametricTemplate> {
        self.templates.iter().filter(move |t| t.category == category)
    }
}

/// Pattern recognizer
///
/// Within each category, elements are clustered by signature distance and
/// every cluster with enough support becomes a template named
/// `<category>-<nnn>`, numbered by the smallest member id. The outcome
/// depends only on the set of input elements, not on their order.
#[derive(Debug, Clone, Default)]
pub struct Recognizer {
    options: RecognizerOptions,
}

impl Recognizer {
    /// Create a recognizer
    pub fn new(options: RecognizerOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &RecognizerOptions {
        &self.options
    }

    /// Recognize families among normalized elements
    pub fn recognize(&self, elements: &[NormalizedElement]) -> Result<RecognitionOutcome> {
        self.recognize_with_progress(elements, Box::new(|_, _| {}))
    }

    /// Recognize with progress reporting
    ///
    /// # Arguments
    /// * `elements` - Normalized elements with unique ids, in any order
    /// * `on_progress` - Callback receiving (phase_name, percent_complete)
    pub fn recognize_with_progress(
        &self,
        elements: &[NormalizedElement],
        on_progress: ProgressCallback,
    ) -> Result<RecognitionOutcome> {
        self.options.validate()?;

        on_progress("Grouping by category", 0.0);
        let mut sorted: Vec<&NormalizedElement> = elements.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut unclustered = Vec::new();
        let mut groups: BTreeMap<SemanticCategory, Vec<(&NormalizedElement, Signature)>> =
            BTreeMap::new();
        for element in sorted {
            if !element.category.is_known() {
                unclustered.push(Unclustered {
                    id: element.id.clone(),
                    category: element.category,
                    reason: UnclusteredReason::Unclassified,
                });
                continue;
            }
            match Signature::of(element, &self.options) {
                Some(signature) => groups
                    .entry(element.category)
                    .or_default()
                    .push((element, signature)),
                None => unclustered.push(Unclustered {
                    id: element.id.clone(),
                    category: element.category,
                    reason: UnclusteredReason::NoGeometry,
                }),
            }
        }

        on_progress("Clustering", 20.0);
        let groups: Vec<(SemanticCategory, Vec<(&NormalizedElement, Signature)>)> =
            groups.into_iter().collect();
        let options = &self.options;
        let clustered: Vec<(SemanticCategory, Vec<Vec<&NormalizedElement>>)> = groups
            .par_iter()
            .map(|(category, entries)| {
                let signatures: Vec<Signature> = entries.iter().map(|(_, s)| s.clone()).collect();
                let clusters: Vec<Vec<&NormalizedElement>> = agglomerate(&signatures, options)
                    .into_iter()
                    .map(|indices| indices.into_iter().map(|i| entries[i].0).collect())
                    .collect();
                (*category, clusters)
            })
            .collect();

        on_progress("Synthesizing templates", 70.0);
        let mut outcome = RecognitionOutcome::default();
        for (category, clusters) in clustered {
            let mut number = 0usize;
            for members in clusters {
                if members.len() < self.options.min_support {
                    let cluster_size = members.len();
                    unclustered.extend(members.iter().map(|m| Unclustered {
                        id: m.id.clone(),
                        category,
                        reason: UnclusteredReason::BelowSupport { cluster_size },
                    }));
                    continue;
                }

                let id = TemplateId::new(format!("{}-{:03}", category.name(), number + 1));
                match synthesize(id.clone(), category, &members, &self.options) {
                    Ok(template) => {
                        number += 1;
                        for member in &members {
                            outcome.assignments.insert(member.id.clone(), id.clone());
                        }
                        log::debug!(
                            "Template {}: {} members, {} parameters",
                            template.id,
                            members.len(),
                            template.schema.len()
                        );
                        outcome.templates.push(template);
                    }
                    Err(e) => {
                        log::warn!(
                            "Cluster of {} {} elements not fittable: {}",
                            members.len(),
                            category,
                            e
                        );
                        let message = e.to_string();
                        unclustered.extend(members.iter().map(|m| Unclustered {
                            id: m.id.clone(),
                            category,
                            reason: UnclusteredReason::Unfittable {
                                message: message.clone(),
                            },
                        }));
                    }
                }
            }
        }

        outcome.templates.sort_by(|a, b| a.id.cmp(&b.id));
        unclustered.sort_by(|a, b| a.id.cmp(&b.id));
        outcome.unclustered = unclustered;

        log::info!(
            "Recognized {} templates covering {} elements ({} unclustered)",
            outcome.templates.len(),
            outcome.assignments.len(),
            outcome.unclustered.len()
        );
        on_progress("Done", 100.0);
        Ok(outcome)
    }
}
