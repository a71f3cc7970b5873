// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export of certified assemblies

use crate::error::{Result, ValidateError};
use crate::manifest::Manifest;
use bimparam_model::{Assembly, Certificate};
use parking_lot::Mutex;
use serde::Serialize;

/// Everything an exporter receives for one assembly
#[derive(Debug, Clone, Serialize)]
pub struct ExportBundle<'a> {
    pub assembly: &'a Assembly,
    pub certificate: &'a Certificate,
    pub manifest: Manifest,
}

impl<'a> ExportBundle<'a> {
    /// Bundle a certified assembly
    ///
    /// Fails with [`ValidateError::Uncertified`] when the assembly has no
    /// certificate or its members changed since validation.
    pub fn new(assembly: &'a Assembly) -> Result<Self> {
        let certificate = assembly
            .certificate()
            .filter(|c| c.matches(assembly))
            .ok_or_else(|| ValidateError::Uncertified(assembly.name().to_string()))?;
        Ok(Self {
            assembly,
            certificate,
            manifest: Manifest::new(assembly, certificate),
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Destination for certified assemblies
pub trait AssemblyExporter: Send + Sync {
    /// Write one bundle
    fn export(&self, bundle: &ExportBundle<'_>) -> Result<()>;
}

/// Exporter keeping JSON bundles in memory
#[derive(Debug, Default)]
pub struct MemoryExporter {
    bundles: Mutex<Vec<String>>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles exported so far, oldest first
    pub fn exported(&self) -> Vec<String> {
        self.bundles.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.bundles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.lock().is_empty()
    }
}

impl AssemblyExporter for MemoryExporter {
    fn export(&self, bundle: &ExportBundle<'_>) -> Result<()> {
        let json = bundle.to_json()?;
        log::debug!(
            "Exported assembly '{}' ({} bytes)",
            bundle.assembly.name(),
            json.len()
        );
        self.bundles.lock().push(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::tests::{column_at, library, pair};
    use crate::AssemblyValidator;
    use bimparam_constraints::ConstraintSet;

    #[test]
    fn test_export_certified_assembly() {
        let mut assembly = pair(0.0);
        let certificate = AssemblyValidator::default()
            .validate(&assembly, &ConstraintSet::new(), &library())
            .unwrap();
        assembly.attach_certificate(certificate).unwrap();

        let exporter = MemoryExporter::new();
        exporter.export(&ExportBundle::new(&assembly).unwrap()).unwrap();
        assert_eq!(exporter.len(), 1);

        let value: serde_json::Value = serde_json::from_str(&exporter.exported()[0]).unwrap();
        assert_eq!(value["certificate"]["assembly"], "frame");
        assert_eq!(value["manifest"]["c2"]["template"], "column-001");
    }

    #[test]
    fn test_uncertified_assembly_not_bundled() {
        let assembly = pair(0.0);
        assert!(matches!(
            ExportBundle::new(&assembly),
            Err(ValidateError::Uncertified(name)) if name == "frame"
        ));
    }

    #[test]
    fn test_moved_member_voids_certificate() {
        let mut assembly = pair(0.0);
        let certificate = AssemblyValidator::default()
            .validate(&assembly, &ConstraintSet::new(), &library())
            .unwrap();
        assembly.attach_certificate(certificate.clone()).unwrap();

        // same revision, 10 m away
        assembly.replace_member(column_at("c2", 10.0, 3.0)).unwrap();
        assert!(assembly.attach_certificate(certificate).is_err());
        assert!(!assembly.is_certified());
        assert!(ExportBundle::new(&assembly).is_err());
        assert!(AssemblyValidator::default()
            .validate(&assembly, &ConstraintSet::new(), &library())
            .is_err());
    }
}
