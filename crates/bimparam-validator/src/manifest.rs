// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat per-instance manifest of a certified assembly

use crate::error::{Result, ValidateError};
use bimparam_model::{Assembly, Certificate, ParameterValues, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the manifest records for one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub template: TemplateId,
    pub version: u32,
    pub revision: u32,
    pub parameters: ParameterValues,
    /// Constraint name -> check result, for constraints reading this member
    pub constraints: BTreeMap<String, bool>,
}

/// Instance key -> entry, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Manifest of an assembly under the given certificate
    pub fn new(assembly: &Assembly, certificate: &Certificate) -> Self {
        let entries = assembly
            .members()
            .iter()
            .map(|member| {
                let constraints = certificate
                    .constraints
                    .iter()
                    .filter(|(_, keys)| keys.iter().any(|k| k == member.key()))
                    .map(|(name, _)| (name.clone(), true))
                    .collect();
                let entry = ManifestEntry {
                    template: member.template.id.clone(),
                    version: member.template.version,
                    revision: member.id.revision,
                    parameters: member.parameters.clone(),
                    constraints,
                };
                (member.key().to_string(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Manifest of an assembly carrying a matching certificate
    pub fn from_certified(assembly: &Assembly) -> Result<Self> {
        let certificate = assembly
            .certificate()
            .filter(|c| c.matches(assembly))
            .ok_or_else(|| ValidateError::Uncertified(assembly.name().to_string()))?;
        Ok(Self::new(assembly, certificate))
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
