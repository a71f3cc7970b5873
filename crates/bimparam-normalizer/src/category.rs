// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Type tag to semantic category lookup

use bimparam_model::SemanticCategory;
use rustc_hash::FxHashMap;

/// Lookup table from type tags to semantic categories
///
/// Keys are matched case-insensitively, so `IfcColumn`, `IFCCOLUMN` and
/// `ifccolumn` resolve the same way. Plain category names (`column`) are
/// accepted as well.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: FxHashMap<String, SemanticCategory>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CategoryTable {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Table covering the common IFC element classes
    pub fn standard() -> Self {
        use SemanticCategory::*;

        let mut table = Self::empty();
        for category in SemanticCategory::KNOWN {
            table.insert(category.name(), category);
        }
        for (tag, category) in [
            // Structure
            ("IFCCOLUMN", Column),
            ("IFCCOLUMNSTANDARDCASE", Column),
            ("IFCBEAM", Beam),
            ("IFCBEAMSTANDARDCASE", Beam),
            ("IFCMEMBER", Member),
            ("IFCMEMBERSTANDARDCASE", Member),
            ("IFCPILE", Member),
            ("IFCSLAB", Slab),
            ("IFCSLABSTANDARDCASE", Slab),
            ("IFCSLABELEMENTEDCASE", Slab),
            ("IFCWALL", Wall),
            ("IFCWALLSTANDARDCASE", Wall),
            ("IFCWALLELEMENTEDCASE", Wall),
            ("IFCCURTAINWALL", Wall),
            ("IFCROOF", Roof),
            ("IFCPLATE", Plate),
            ("IFCPLATESTANDARDCASE", Plate),
            ("IFCFOOTING", Foundation),
            ("FOOTING", Foundation),
            ("IFCSTAIR", Stair),
            ("IFCSTAIRFLIGHT", Stair),
            ("IFCCOVERING", Covering),
            // Distribution systems
            ("IFCDUCTSEGMENT", Duct),
            ("IFCDUCTFITTING", Duct),
            ("IFCPIPESEGMENT", Pipe),
            ("IFCPIPEFITTING", Pipe),
        ] {
            table.insert(tag, category);
        }
        table
    }

    /// Add or override a mapping
    pub fn insert(&mut self, tag: &str, category: SemanticCategory) {
        self.entries.insert(tag.trim().to_uppercase(), category);
    }

    /// Builder form of [`CategoryTable::insert`]
    pub fn with(mut self, tag: &str, category: SemanticCategory) -> Self {
        self.insert(tag, category);
        self
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no mappings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a type tag
    pub fn resolve(&self, tag: &str) -> Option<SemanticCategory> {
        self.entries.get(&tag.trim().to_uppercase()).copied()
    }

    /// Resolve from an object name such as `Level 2/IfcBeam/B-12`
    ///
    /// The first path segment starting with `Ifc` is looked up.
    pub fn resolve_name(&self, name: &str) -> Option<SemanticCategory> {
        name.split('/')
            .map(str::trim)
            .find(|segment| {
                segment.len() > 3
                    && segment
                        .get(..3)
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ifc"))
            })
            .and_then(|segment| self.resolve(segment))
    }

    /// Resolve a record from its tag, falling back to its name
    pub fn classify(&self, tag: &str, name: Option<&str>) -> Option<SemanticCategory> {
        self.resolve(tag)
            .or_else(|| name.and_then(|n| self.resolve_name(n)))
    }
}
