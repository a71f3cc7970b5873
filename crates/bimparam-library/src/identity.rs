// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matching freshly recognized families to stored identities
//!
//! Recognition numbers templates per batch, so the same family can come
//! back under another number. Before storing, each recognized template is
//! matched to the stored identity of its category whose latest version
//! shares the most source elements with it. Unmatched templates get the
//! next free number of their category.

use crate::store::LibraryStore;
use bimparam_model::{ParametricTemplate, SemanticCategory, TemplateId};
use std::collections::{BTreeMap, BTreeSet};

/// Recognized templates carrying their final identities
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Renamed templates, ordered by final id
    pub templates: Vec<ParametricTemplate>,
    /// Recognized id → final id, for every template
    pub renamed: BTreeMap<TemplateId, TemplateId>,
}

impl Reconciliation {
    /// Final identity of a recognized template
    pub fn identity_of(&self, recognized: &TemplateId) -> Option<&TemplateId> {
        self.renamed.get(recognized)
    }
}

/// Numeric suffix of a `<category>-<nnn>` id
fn ordinal(category: SemanticCategory, id: &TemplateId) -> Option<usize> {
    id.as_str()
        .strip_prefix(category.name())
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|n| n.parse().ok())
}

impl LibraryStore {
    /// Give recognized templates the identities of the families they continue
    ///
    /// A recognized template continues a stored identity of the same
    /// category when their provenances overlap; the largest overlap wins,
    /// then the smaller ids. Each stored identity is continued at most once
    /// per batch. Every other template gets a fresh `<category>-<nnn>` id
    /// numbered after the highest stored one, in recognized id order.
    ///
    /// The store is only read; call [`LibraryStore::put`] on the result.
    pub fn reconcile(&self, templates: Vec<ParametricTemplate>) -> Reconciliation {
        let mut templates = templates;
        templates.sort_by(|a, b| a.id.cmp(&b.id));

        let categories: BTreeSet<SemanticCategory> = templates.iter().map(|t| t.category).collect();
        let mut stored = Vec::new();
        let mut next_ordinal: BTreeMap<SemanticCategory, usize> = BTreeMap::new();
        for category in categories {
            let mut highest = 0;
            for existing in self.find_by_category(category) {
                highest = highest.max(ordinal(category, &existing.reference.id).unwrap_or(0));
                stored.push(existing);
            }
            next_ordinal.insert(category, highest + 1);
        }

        // (overlap, recognized index, stored index), best first
        let mut candidates = Vec::new();
        for (i, template) in templates.iter().enumerate() {
            for (j, existing) in stored.iter().enumerate() {
                if existing.template.category != template.category {
                    continue;
                }
                let overlap = template
                    .provenance
                    .intersection(&existing.template.provenance)
                    .count();
                if overlap > 0 {
                    candidates.push((overlap, i, j));
                }
            }
        }
        candidates.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| templates[a.1].id.cmp(&templates[b.1].id))
                .then_with(|| stored[a.2].reference.id.cmp(&stored[b.2].reference.id))
        });

        let mut assigned: Vec<Option<TemplateId>> = vec![None; templates.len()];
        let mut taken = BTreeSet::new();
        for (overlap, i, j) in candidates {
            let id = &stored[j].reference.id;
            if assigned[i].is_some() || taken.contains(id) {
                continue;
            }
            log::debug!(
                "Recognized {} continues {} ({} shared elements)",
                templates[i].id,
                id,
                overlap
            );
            taken.insert(id.clone());
            assigned[i] = Some(id.clone());
        }

        let mut renamed = BTreeMap::new();
        for (template, identity) in templates.iter_mut().zip(assigned) {
            let identity = identity.unwrap_or_else(|| {
                let number = next_ordinal.entry(template.category).or_insert(1);
                let id = TemplateId::new(format!("{}-{:03}", template.category.name(), number));
                *number += 1;
                id
            });
            renamed.insert(template.id.clone(), identity.clone());
            template.id = identity;
        }
        templates.sort_by(|a, b| a.id.cmp(&b.id));

        Reconciliation { templates, renamed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::template;
    use bimparam_model::ElementId;

    fn family(id: &str, members: &[&str], max_height: f64) -> ParametricTemplate {
        let mut t = template(id, SemanticCategory::Column, max_height);
        t.provenance = members.iter().map(|m| ElementId::new(*m)).collect();
        t
    }

    #[test]
    fn test_empty_store_keeps_recognized_ids() {
        let store = LibraryStore::new();
        let outcome = store.reconcile(vec![
            family("column-002", &["C1"], 6.0),
            family("column-001", &["A1"], 7.0),
        ]);
        let ids: Vec<&str> = outcome.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["column-001", "column-002"]);
        assert_eq!(
            outcome.identity_of(&TemplateId::new("column-002")),
            Some(&TemplateId::new("column-002"))
        );
    }

    #[test]
    fn test_new_family_sorting_first_keeps_identities() {
        let store = LibraryStore::new();
        store.put(family("column-001", &["C1", "C2", "C3"], 6.2)).unwrap();

        // A1/A2 sort first, so the batch numbers them 001
        let outcome = store.reconcile(vec![
            family("column-001", &["A1", "A2"], 18.0),
            family("column-002", &["C1", "C2", "C3"], 6.2),
        ]);
        assert_eq!(
            outcome.identity_of(&TemplateId::new("column-002")),
            Some(&TemplateId::new("column-001"))
        );
        assert_eq!(
            outcome.identity_of(&TemplateId::new("column-001")),
            Some(&TemplateId::new("column-002"))
        );

        for template in outcome.templates {
            store.put(template).unwrap();
        }
        let columns = store.history("column-001").unwrap();
        assert_eq!(columns.len(), 1);
        assert!(columns[0].template.provenance.contains(&ElementId::new("C1")));
        let added = store.get("column-002").unwrap();
        assert!(added.template.provenance.contains(&ElementId::new("A1")));
    }

    #[test]
    fn test_largest_overlap_continues_identity() {
        let store = LibraryStore::new();
        store.put(family("column-001", &["C1", "C2", "C3"], 6.2)).unwrap();
        store.put(family("column-002", &["D1", "D2"], 7.0)).unwrap();

        // the stored C family split in two; the bigger part keeps the id
        let outcome = store.reconcile(vec![
            family("column-001", &["C1"], 5.0),
            family("column-002", &["C2", "C3", "C4"], 6.5),
        ]);
        assert_eq!(
            outcome.identity_of(&TemplateId::new("column-002")),
            Some(&TemplateId::new("column-001"))
        );
        assert_eq!(
            outcome.identity_of(&TemplateId::new("column-001")),
            Some(&TemplateId::new("column-003"))
        );
    }

    #[test]
    fn test_ordinal_parsing() {
        let category = SemanticCategory::Column;
        assert_eq!(ordinal(category, &TemplateId::new("column-012")), Some(12));
        assert_eq!(ordinal(category, &TemplateId::new("beam-001")), None);
        assert_eq!(ordinal(category, &TemplateId::new("column-x")), None);
    }
}
