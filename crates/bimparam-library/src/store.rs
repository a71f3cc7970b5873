// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Versioned template store

use crate::error::{LibraryError, Result};
use bimparam_model::{
    ParametricTemplate, SemanticCategory, TemplateId, TemplateLookup, TemplateRef,
    VersionedTemplate,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Version history of one identity, oldest first
type Slot = Arc<RwLock<Vec<Arc<ParametricTemplate>>>>;

/// Thread-safe library of parametric templates
///
/// Each template identity owns an append-only version history guarded by
/// its own lock: one writer or many readers per identity, while writers on
/// different identities never wait on each other. The identity map is only
/// locked to look up or create a slot.
#[derive(Debug, Default)]
pub struct LibraryStore {
    slots: RwLock<FxHashMap<TemplateId, Slot>>,
    categories: RwLock<BTreeMap<SemanticCategory, BTreeSet<TemplateId>>>,
}

impl LibraryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of template identities
    pub fn len(&self) -> usize {
        self.identities().len()
    }

    /// Check if the store holds no templates
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every identity with at least one version, ordered
    pub fn identities(&self) -> Vec<TemplateId> {
        let mut ids: Vec<TemplateId> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| !slot.read().is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn slot(&self, id: &TemplateId) -> Option<Slot> {
        self.slots.read().get(id).cloned()
    }

    fn slot_or_create(&self, id: &TemplateId) -> Slot {
        if let Some(slot) = self.slot(id) {
            return slot;
        }
        self.slots.write().entry(id.clone()).or_default().clone()
    }

    /// Store a template as the next version of its identity
    ///
    /// Putting content identical to the latest version returns the existing
    /// reference without creating a new version.
    ///
    /// # Arguments
    /// * `template` - Template to store; its schema invariants are checked
    ///
    /// # Returns
    /// Reference to the stored (or identical existing) version
    pub fn put(&self, template: ParametricTemplate) -> Result<TemplateRef> {
        self.put_checked(template, None)
    }

    /// Compare-and-swap put
    ///
    /// Succeeds only while the latest version of the identity equals
    /// `expected_version` (0 for an identity that does not exist yet).
    pub fn put_expecting(
        &self,
        template: ParametricTemplate,
        expected_version: u32,
    ) -> Result<TemplateRef> {
        self.put_checked(template, Some(expected_version))
    }

    fn put_checked(
        &self,
        template: ParametricTemplate,
        expected_version: Option<u32>,
    ) -> Result<TemplateRef> {
        template.validate().map_err(LibraryError::SchemaViolation)?;

        let id = template.id.clone();
        let slot = self.slot_or_create(&id);
        let mut versions = slot.write();
        let current = versions.len() as u32;

        if let Some(latest) = versions.last() {
            if **latest == template {
                return Ok(TemplateRef::new(id, current));
            }
            if latest.category != template.category {
                return Err(LibraryError::CategoryChanged {
                    id,
                    from: latest.category,
                    to: template.category,
                });
            }
        }
        if let Some(expected) = expected_version {
            if expected != current {
                return Err(LibraryError::VersionConflict {
                    id,
                    expected,
                    actual: current,
                });
            }
        }

        let category = template.category;
        versions.push(Arc::new(template));
        let version = current + 1;
        self.categories
            .write()
            .entry(category)
            .or_default()
            .insert(id.clone());
        log::debug!("Stored template {}@v{}", id, version);
        Ok(TemplateRef::new(id, version))
    }

    /// Latest version of a template
    pub fn get(&self, id: &str) -> Result<VersionedTemplate> {
        let id = TemplateId::new(id);
        let slot = self.slot(&id).ok_or_else(|| LibraryError::NotFound(id.clone()))?;
        let versions = slot.read();
        let latest = versions.last().ok_or_else(|| LibraryError::NotFound(id.clone()))?;
        Ok(VersionedTemplate {
            reference: TemplateRef::new(id, versions.len() as u32),
            template: Arc::clone(latest),
        })
    }

    /// One specific version
    pub fn get_version(&self, reference: &TemplateRef) -> Result<VersionedTemplate> {
        let slot = self
            .slot(&reference.id)
            .ok_or_else(|| LibraryError::NotFound(reference.id.clone()))?;
        let versions = slot.read();
        let template = (reference.version as usize)
            .checked_sub(1)
            .and_then(|i| versions.get(i))
            .ok_or_else(|| LibraryError::VersionNotFound(reference.clone()))?;
        Ok(VersionedTemplate {
            reference: reference.clone(),
            template: Arc::clone(template),
        })
    }

    /// Every version of a template, oldest first
    pub fn history(&self, id: &str) -> Result<Vec<VersionedTemplate>> {
        let id = TemplateId::new(id);
        let slot = self.slot(&id).ok_or_else(|| LibraryError::NotFound(id.clone()))?;
        let versions = slot.read();
        if versions.is_empty() {
            return Err(LibraryError::NotFound(id));
        }
        Ok(versions
            .iter()
            .enumerate()
            .map(|(i, template)| VersionedTemplate {
                reference: TemplateRef::new(id.clone(), i as u32 + 1),
                template: Arc::clone(template),
            })
            .collect())
    }

    /// Lazy cursor over the latest versions of one category
    ///
    /// The set of identities is fixed when the cursor is created; each
    /// template is resolved when the cursor reaches it.
    pub fn find_by_category(&self, category: SemanticCategory) -> CategoryCursor<'_> {
        let ids: Vec<TemplateId> = self
            .categories
            .read()
            .get(&category)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        CategoryCursor {
            store: self,
            ids: Arc::new(ids),
            position: 0,
        }
    }

    pub(crate) fn versions_of(&self, id: &TemplateId) -> Vec<Arc<ParametricTemplate>> {
        self.slot(id).map(|slot| slot.read().clone()).unwrap_or_default()
    }

    /// Install a loaded history; the identity must not exist yet
    pub(crate) fn install(&self, id: TemplateId, versions: Vec<Arc<ParametricTemplate>>) {
        if let Some(category) = versions.last().map(|t| t.category) {
            self.categories
                .write()
                .entry(category)
                .or_default()
                .insert(id.clone());
        }
        self.slots.write().insert(id, Arc::new(RwLock::new(versions)));
    }
}

impl TemplateLookup for LibraryStore {
    fn lookup(&self, reference: &TemplateRef) -> Option<Arc<ParametricTemplate>> {
        self.get_version(reference).ok().map(|v| v.template)
    }
}

/// Restartable cursor over the templates of one category
#[derive(Debug, Clone)]
pub struct CategoryCursor<'a> {
    store: &'a LibraryStore,
    ids: Arc<Vec<TemplateId>>,
    position: usize,
}

impl CategoryCursor<'_> {
    /// Go back to the first template
    pub fn restart(&mut self) {
        self.position = 0;
    }

    /// Number of identities the cursor covers
    pub fn total(&self) -> usize {
        self.ids.len()
    }
}

impl Iterator for CategoryCursor<'_> {
    type Item = VersionedTemplate;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.ids.get(self.position) {
            self.position += 1;
            if let Ok(template) = self.store.get(id.as_str()) {
                return Some(template);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ids.len().saturating_sub(self.position)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bimparam_model::{Binding, GenerativeRule, Interval, ParameterSpec, ProfileKind};

    pub(crate) fn template(id: &str, category: SemanticCategory, max_height: f64) -> ParametricTemplate {
        ParametricTemplate {
            id: TemplateId::new(id),
            category,
            schema: vec![ParameterSpec::real(
                "height",
                Interval::new(3.0, 3.1),
                Interval::new(1.5, max_height),
                3.05,
            )],
            rule: GenerativeRule {
                category,
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
            provenance: BTreeSet::new(),
        }
    }

    #[test]
    fn test_put_and_get() {
        let store = LibraryStore::new();
        let r1 = store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        assert_eq!(r1, TemplateRef::new("column-001", 1));
        let r2 = store.put(template("column-001", SemanticCategory::Column, 8.0)).unwrap();
        assert_eq!(r2.version, 2);

        let latest = store.get("column-001").unwrap();
        assert_eq!(latest.reference, r2);
        assert_eq!(latest.template.schema[0].domain.max, 8.0);
        assert_eq!(store.get_version(&r1).unwrap().template.schema[0].domain.max, 6.2);
        assert_eq!(store.history("column-001").unwrap().len(), 2);
    }

    #[test]
    fn test_identical_put_is_idempotent() {
        let store = LibraryStore::new();
        let r1 = store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        let r2 = store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(store.history("column-001").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_templates() {
        let store = LibraryStore::new();
        assert_eq!(
            store.get("nonexistent-template"),
            Err(LibraryError::NotFound(TemplateId::new("nonexistent-template")))
        );
        store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        let missing = TemplateRef::new("column-001", 7);
        assert_eq!(
            store.get_version(&missing),
            Err(LibraryError::VersionNotFound(missing.clone()))
        );
        assert!(store
            .get_version(&TemplateRef::new("column-001", 0))
            .is_err());
    }

    #[test]
    fn test_schema_violation_rejected() {
        let store = LibraryStore::new();
        let mut bad = template("column-001", SemanticCategory::Column, 6.2);
        bad.schema[0].default = 100.0;
        assert!(matches!(store.put(bad), Err(LibraryError::SchemaViolation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_compare_and_swap() {
        let store = LibraryStore::new();
        store
            .put_expecting(template("column-001", SemanticCategory::Column, 6.2), 0)
            .unwrap();
        let conflict = store.put_expecting(template("column-001", SemanticCategory::Column, 7.0), 0);
        assert_eq!(
            conflict,
            Err(LibraryError::VersionConflict {
                id: TemplateId::new("column-001"),
                expected: 0,
                actual: 1
            })
        );
        assert!(store
            .put_expecting(template("column-001", SemanticCategory::Column, 7.0), 1)
            .is_ok());
    }

    #[test]
    fn test_category_is_fixed() {
        let store = LibraryStore::new();
        store.put(template("t-001", SemanticCategory::Column, 6.2)).unwrap();
        assert!(matches!(
            store.put(template("t-001", SemanticCategory::Beam, 6.2)),
            Err(LibraryError::CategoryChanged { .. })
        ));
    }

    #[test]
    fn test_category_cursor() {
        let store = LibraryStore::new();
        store.put(template("column-002", SemanticCategory::Column, 6.2)).unwrap();
        store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        store.put(template("beam-001", SemanticCategory::Beam, 6.2)).unwrap();

        let mut cursor = store.find_by_category(SemanticCategory::Column);
        assert_eq!(cursor.total(), 2);
        let ids: Vec<String> = cursor.by_ref().map(|t| t.reference.id.0).collect();
        assert_eq!(ids, vec!["column-001", "column-002"]);
        assert!(cursor.next().is_none());

        // Resolved lazily: a version stored before the restart is visible
        store.put(template("column-001", SemanticCategory::Column, 9.0)).unwrap();
        cursor.restart();
        assert_eq!(cursor.next().unwrap().reference.version, 2);

        assert_eq!(store.find_by_category(SemanticCategory::Slab).count(), 0);
    }

    #[test]
    fn test_concurrent_puts_keep_every_version() {
        let store = LibraryStore::new();
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..10 {
                        let max = 7.0 + (worker * 10 + i) as f64;
                        store
                            .put(template("column-001", SemanticCategory::Column, max))
                            .unwrap();
                    }
                });
            }
        });
        let history = store.history("column-001").unwrap();
        assert_eq!(history.len(), 80);
        let versions: Vec<u32> = history.iter().map(|v| v.reference.version).collect();
        assert_eq!(versions, (1..=80).collect::<Vec<u32>>());
    }

    #[test]
    fn test_lookup_trait() {
        let store = LibraryStore::new();
        let r = store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        let lookup: &dyn TemplateLookup = &store;
        assert!(lookup.lookup(&r).is_some());
        assert!(lookup.lookup(&TemplateRef::new("column-001", 2)).is_none());
    }
}
