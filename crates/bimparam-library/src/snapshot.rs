// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Self-describing JSON snapshots of a library
//!
//! A snapshot carries a format tag and version, then every identity with
//! its full version history. Loading re-checks every template and the
//! contiguity of every history; any inconsistency is fatal.

use crate::error::{LibraryError, Result};
use crate::store::LibraryStore;
use bimparam_model::{ParametricTemplate, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::sync::Arc;

/// Format tag written into every snapshot
pub const SNAPSHOT_FORMAT: &str = "bimparam-library";

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    format: String,
    format_version: u32,
    templates: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    id: TemplateId,
    versions: Vec<StoredVersion>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredVersion {
    version: u32,
    template: ParametricTemplate,
}

impl LibraryStore {
    fn snapshot(&self) -> Snapshot {
        let templates = self
            .identities()
            .into_iter()
            .map(|id| {
                let versions = self
                    .versions_of(&id)
                    .iter()
                    .enumerate()
                    .map(|(i, template)| StoredVersion {
                        version: i as u32 + 1,
                        template: ParametricTemplate::clone(template),
                    })
                    .collect();
                SnapshotEntry { id, versions }
            })
            .collect();
        Snapshot {
            format: SNAPSHOT_FORMAT.to_string(),
            format_version: SNAPSHOT_VERSION,
            templates,
        }
    }

    /// Serialize every identity and version to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Write a JSON snapshot
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.snapshot())?;
        Ok(())
    }

    /// Load a store from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Read a store from a JSON snapshot
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Self::from_snapshot(snapshot)
    }

    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        check_snapshot(&snapshot).inspect_err(|e| log::error!("{}", e))?;

        let store = LibraryStore::new();
        let count = snapshot.templates.len();
        for entry in snapshot.templates {
            let versions = entry
                .versions
                .into_iter()
                .map(|v| Arc::new(v.template))
                .collect();
            store.install(entry.id, versions);
        }
        log::info!("Loaded library snapshot with {} templates", count);
        Ok(store)
    }
}

fn check_snapshot(snapshot: &Snapshot) -> Result<()> {
    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(LibraryError::corrupt(
            "",
            0,
            "read header",
            format!("unexpected format '{}'", snapshot.format),
        ));
    }
    if snapshot.format_version != SNAPSHOT_VERSION {
        return Err(LibraryError::corrupt(
            "",
            0,
            "read header",
            format!("unsupported format version {}", snapshot.format_version),
        ));
    }

    let mut seen = BTreeSet::new();
    for entry in &snapshot.templates {
        let identity = entry.id.as_str();
        if !seen.insert(identity) {
            return Err(LibraryError::corrupt(identity, 0, "index identities", "duplicate identity"));
        }
        if entry.versions.is_empty() {
            return Err(LibraryError::corrupt(identity, 0, "read history", "empty version history"));
        }
        let category = entry.versions[0].template.category;
        for (i, stored) in entry.versions.iter().enumerate() {
            let expected = i as u32 + 1;
            if stored.version != expected {
                return Err(LibraryError::corrupt(
                    identity,
                    stored.version,
                    "check version order",
                    format!("expected version {}", expected),
                ));
            }
            if stored.template.id != entry.id {
                return Err(LibraryError::corrupt(
                    identity,
                    stored.version,
                    "check identity",
                    format!("template is labelled '{}'", stored.template.id),
                ));
            }
            if stored.template.category != category {
                return Err(LibraryError::corrupt(
                    identity,
                    stored.version,
                    "check category",
                    format!("category changed to '{}'", stored.template.category),
                ));
            }
            stored.template.validate().map_err(|e| {
                LibraryError::corrupt(identity, stored.version, "validate template", e.to_string())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::template;
    use bimparam_model::{Interval, SemanticCategory};

    fn populated() -> LibraryStore {
        let store = LibraryStore::new();
        store.put(template("column-001", SemanticCategory::Column, 6.2)).unwrap();
        store.put(template("column-001", SemanticCategory::Column, 8.0)).unwrap();
        store.put(template("beam-001", SemanticCategory::Beam, 6.2)).unwrap();
        store
    }

    #[test]
    fn test_round_trip_keeps_history() {
        let store = populated();
        let json = store.to_json().unwrap();
        let loaded = LibraryStore::from_json(&json).unwrap();

        assert_eq!(loaded.identities(), store.identities());
        assert_eq!(loaded.history("column-001").unwrap(), store.history("column-001").unwrap());
        assert_eq!(loaded.find_by_category(SemanticCategory::Beam).count(), 1);
        // Stable output
        assert_eq!(loaded.to_json().unwrap(), json);
    }

    #[test]
    fn test_cluster_means_round_trip_exactly() {
        let store = LibraryStore::new();
        for i in 0..50 {
            let heights = [2.9 + i as f64 * 0.013, 3.05 + i as f64 * 0.007, 3.1 + i as f64 * 0.011];
            let mean = heights.iter().sum::<f64>() / 3.0;
            let mut t = template(&format!("column-{:03}", i + 1), SemanticCategory::Column, 6.2);
            t.schema[0].observed = Interval::new(heights[0].min(heights[1]), heights[2].max(heights[1]));
            t.schema[0].default = mean;
            store.put(t).unwrap();
        }
        let mut awkward = template("column-999", SemanticCategory::Column, 6.2);
        awkward.schema[0].default = 3.0500000000000003;
        store.put(awkward).unwrap();

        let loaded = LibraryStore::from_json(&store.to_json().unwrap()).unwrap();
        for id in store.identities() {
            let before = store.history(id.as_str()).unwrap();
            let after = loaded.history(id.as_str()).unwrap();
            assert_eq!(
                after[0].template.schema[0].default.to_bits(),
                before[0].template.schema[0].default.to_bits(),
                "{}",
                id
            );
            assert_eq!(after, before);
        }
    }

    #[test]
    fn test_writer_and_reader() {
        let store = populated();
        let mut buffer = Vec::new();
        store.to_writer(&mut buffer).unwrap();
        let loaded = LibraryStore::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_wrong_format_is_corrupt() {
        let json = r#"{"format": "other", "format_version": 1, "templates": []}"#;
        assert!(matches!(
            LibraryStore::from_json(json),
            Err(LibraryError::Corrupt { operation: "read header", .. })
        ));
    }

    #[test]
    fn test_version_gap_is_corrupt() {
        let json = populated().to_json().unwrap();
        let broken = json.replacen("\"version\": 2", "\"version\": 3", 1);
        match LibraryStore::from_json(&broken) {
            Err(LibraryError::Corrupt {
                identity,
                version,
                operation,
                ..
            }) => {
                assert_eq!(identity, "column-001");
                assert_eq!(version, 3);
                assert_eq!(operation, "check version order");
            }
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_template_is_corrupt() {
        let json = populated().to_json().unwrap();
        let broken = json.replacen("\"default\": 3.05", "\"default\": 99.0", 1);
        assert!(matches!(
            LibraryStore::from_json(&broken),
            Err(LibraryError::Corrupt { operation: "validate template", .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            LibraryStore::from_json("{not json"),
            Err(LibraryError::Serialization(_))
        ));
    }
}
