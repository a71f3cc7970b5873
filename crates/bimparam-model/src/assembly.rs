// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assemblies of template instances and their certificates

use crate::{
    BoundingBox, InstanceId, ModelError, ParameterValues, Placement, PropertyMap, RelationKind,
    Result, TemplateInstance, TemplateRef,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Spatial relation asserted between two members, by instance key
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssertedRelation {
    pub kind: RelationKind,
    pub from: String,
    pub to: String,
}

/// What a certificate pins of one member
///
/// Everything the validator reads: revision, template version, parameter
/// values, placement, bounds and derived properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CertifiedMember {
    pub id: InstanceId,
    pub template: TemplateRef,
    pub parameters: ParameterValues,
    pub placement: Placement,
    pub bounds: BoundingBox,
    pub properties: PropertyMap,
}

impl CertifiedMember {
    /// Seal the current content of an instance
    pub fn of(instance: &TemplateInstance) -> Self {
        Self {
            id: instance.id.clone(),
            template: instance.template.clone(),
            parameters: instance.parameters.clone(),
            placement: instance.placement,
            bounds: instance.descriptor.bounds,
            properties: instance.properties.clone(),
        }
    }

    /// Check the instance still has the sealed content
    pub fn matches(&self, instance: &TemplateInstance) -> bool {
        self.id == instance.id
            && self.template == instance.template
            && self.parameters == instance.parameters
            && self.placement == instance.placement
            && self.bounds == instance.descriptor.bounds
            && self.properties == instance.properties
    }
}

/// Proof that an assembly passed validation
///
/// Pins the member contents, asserted relations and compatible pairs that
/// were checked. Any change to them invalidates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub assembly: String,
    /// Member key → sealed content
    pub members: BTreeMap<String, CertifiedMember>,
    pub relations: Vec<AssertedRelation>,
    pub compatible: BTreeSet<(String, String)>,
    /// Constraint name → member keys it was evaluated against
    pub constraints: BTreeMap<String, Vec<String>>,
}

impl Certificate {
    /// Certificate for the assembly as it is now
    ///
    /// Issued by the validator once every check has passed.
    pub fn issue(assembly: &Assembly, constraints: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            assembly: assembly.name.clone(),
            members: assembly
                .members
                .iter()
                .map(|m| (m.key().to_string(), CertifiedMember::of(m)))
                .collect(),
            relations: assembly.relations.clone(),
            compatible: assembly.compatible.clone(),
            constraints,
        }
    }

    /// Check the certificate was issued for the assembly as it is now
    pub fn matches(&self, assembly: &Assembly) -> bool {
        self.assembly == assembly.name
            && self.relations == assembly.relations
            && self.compatible == assembly.compatible
            && self.members.len() == assembly.members.len()
            && assembly
                .members
                .iter()
                .all(|m| self.members.get(m.key()).is_some_and(|sealed| sealed.matches(m)))
    }
}

/// Ordered collection of instances plus asserted relations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    name: String,
    members: Vec<TemplateInstance>,
    relations: Vec<AssertedRelation>,
    compatible: BTreeSet<(String, String)>,
    certificate: Option<Certificate>,
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Assembly {
    /// Create an empty assembly
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            relations: Vec::new(),
            compatible: BTreeSet::new(),
            certificate: None,
        }
    }

    /// Assembly name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in insertion order
    pub fn members(&self) -> &[TemplateInstance] {
        &self.members
    }

    /// Asserted relations in insertion order
    pub fn relations(&self) -> &[AssertedRelation] {
        &self.relations
    }

    /// Pairs explicitly allowed to overlap
    pub fn compatible_pairs(&self) -> &BTreeSet<(String, String)> {
        &self.compatible
    }

    /// Look up a member by key
    pub fn member(&self, key: &str) -> Option<&TemplateInstance> {
        self.members.iter().find(|m| m.key() == key)
    }

    /// Add a member; keys are unique within an assembly
    pub fn add_member(&mut self, instance: TemplateInstance) -> Result<()> {
        if self.member(instance.key()).is_some() {
            return Err(ModelError::DuplicateMember(instance.key().to_string()));
        }
        self.members.push(instance);
        self.certificate = None;
        Ok(())
    }

    /// Builder form of [`Assembly::add_member`]
    pub fn with_member(mut self, instance: TemplateInstance) -> Result<Self> {
        self.add_member(instance)?;
        Ok(self)
    }

    /// Replace the member with the same key, returning the old instance
    ///
    /// Drops any certificate.
    pub fn replace_member(&mut self, instance: TemplateInstance) -> Result<TemplateInstance> {
        let slot = self
            .members
            .iter_mut()
            .find(|m| m.key() == instance.key())
            .ok_or_else(|| ModelError::UnknownMember(instance.key().to_string()))?;
        let old = std::mem::replace(slot, instance);
        self.certificate = None;
        Ok(old)
    }

    /// Assert a relation between two member keys
    ///
    /// Keys are not checked here; the validator reports unknown keys.
    pub fn relate(&mut self, kind: RelationKind, from: impl Into<String>, to: impl Into<String>) {
        self.relations.push(AssertedRelation {
            kind,
            from: from.into(),
            to: to.into(),
        });
        self.certificate = None;
    }

    /// Allow two members to share space
    pub fn mark_compatible(&mut self, a: &str, b: &str) {
        self.compatible.insert(ordered_pair(a, b));
        self.certificate = None;
    }

    /// Check if two members are allowed to overlap
    pub fn is_compatible(&self, a: &str, b: &str) -> bool {
        self.compatible.contains(&ordered_pair(a, b))
    }

    /// Attach a certificate issued for this assembly
    pub fn attach_certificate(&mut self, certificate: Certificate) -> Result<()> {
        if !certificate.matches(self) {
            return Err(ModelError::CertificateMismatch(self.name.clone()));
        }
        self.certificate = Some(certificate);
        Ok(())
    }

    /// Current certificate, if any
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Check if the assembly holds a matching certificate
    pub fn is_certified(&self) -> bool {
        self.certificate
            .as_ref()
            .map(|c| c.matches(self))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeometricDescriptor, PrincipalAxis, PropertyValue};

    fn instance(key: &str) -> TemplateInstance {
        TemplateInstance {
            id: InstanceId::new(key),
            template: TemplateRef::new("column-001", 1),
            parameters: ParameterValues::new(),
            placement: Placement::default(),
            descriptor: GeometricDescriptor {
                bounds: BoundingBox::default(),
                axis: PrincipalAxis::default(),
                length: 0.0,
                depth: 0.0,
                width: 0.0,
                section: None,
            },
            properties: PropertyMap::new(),
            supersedes: None,
        }
    }

    fn certificate_for(assembly: &Assembly) -> Certificate {
        Certificate::issue(assembly, BTreeMap::new())
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut assembly = Assembly::new("frame");
        assembly.add_member(instance("a")).unwrap();
        assert_eq!(
            assembly.add_member(instance("a")),
            Err(ModelError::DuplicateMember("a".to_string()))
        );
    }

    #[test]
    fn test_replacing_member_drops_certificate() {
        let mut assembly = Assembly::new("frame")
            .with_member(instance("a"))
            .unwrap()
            .with_member(instance("b"))
            .unwrap();
        let certificate = certificate_for(&assembly);
        assembly.attach_certificate(certificate.clone()).unwrap();
        assert!(assembly.is_certified());

        let mut replacement = instance("a");
        replacement.id = replacement.id.next();
        let old = assembly.replace_member(replacement).unwrap();
        assert_eq!(old.id.revision, 1);
        assert!(!assembly.is_certified());
        assert!(!certificate.matches(&assembly));
        assert_eq!(
            assembly.attach_certificate(certificate),
            Err(ModelError::CertificateMismatch("frame".to_string()))
        );
    }

    #[test]
    fn test_stale_certificate_cannot_be_reattached() {
        let pair = || {
            Assembly::new("frame")
                .with_member(instance("a"))
                .unwrap()
                .with_member(instance("b"))
                .unwrap()
        };

        // same revision, moved elsewhere
        let mut assembly = pair();
        let certificate = certificate_for(&assembly);
        let mut moved = instance("b");
        moved.placement = Placement::at(10.0, 0.0, 0.0);
        moved.descriptor.bounds = BoundingBox::new([10.0, 0.0, 0.0], [10.4, 0.4, 3.0]);
        assembly.replace_member(moved).unwrap();
        assert!(assembly.attach_certificate(certificate).is_err());
        assert!(!assembly.is_certified());

        // relation asserted after certification
        let mut assembly = pair();
        let certificate = certificate_for(&assembly);
        assembly.relate(RelationKind::Adjacency, "a", "b");
        assert!(assembly.attach_certificate(certificate).is_err());

        // compatible pair added after certification
        let mut assembly = pair();
        let certificate = certificate_for(&assembly);
        assembly.mark_compatible("a", "b");
        assert!(!certificate.matches(&assembly));

        // derived property changed without a new revision
        let mut assembly = pair();
        let certificate = certificate_for(&assembly);
        let mut relabeled = instance("a");
        relabeled.properties.insert(
            "Material".to_string(),
            PropertyValue::Text("S235".to_string()),
        );
        assembly.replace_member(relabeled).unwrap();
        assert!(!certificate.matches(&assembly));

        // unchanged assembly still takes it
        let mut assembly = pair();
        let certificate = certificate_for(&assembly);
        assembly.attach_certificate(certificate).unwrap();
        assert!(assembly.is_certified());
    }

    #[test]
    fn test_compatible_pairs_are_unordered() {
        let mut assembly = Assembly::new("frame");
        assembly.mark_compatible("b", "a");
        assert!(assembly.is_compatible("a", "b"));
        assert!(!assembly.is_compatible("a", "c"));
    }
}
