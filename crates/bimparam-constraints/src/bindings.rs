// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Slot bindings: what each instance key resolves to during evaluation

use crate::error::{ConstraintError, Result};
use bimparam_model::{
    GeometricDescriptor, ParameterValues, ParametricTemplate, PropertyMap, TemplateInstance,
};
use std::collections::BTreeMap;

/// Everything a constraint may read about one instance
#[derive(Debug, Clone, Copy)]
pub struct Slot<'a> {
    /// Template schema the values are checked against
    pub template: &'a ParametricTemplate,
    pub values: &'a ParameterValues,
    pub descriptor: &'a GeometricDescriptor,
    pub properties: &'a PropertyMap,
}

impl<'a> Slot<'a> {
    /// Slot for an existing instance of `template`
    pub fn of_instance(instance: &'a TemplateInstance, template: &'a ParametricTemplate) -> Self {
        Self {
            template,
            values: &instance.parameters,
            descriptor: &instance.descriptor,
            properties: &instance.properties,
        }
    }
}

/// Slot name to instance mapping
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    slots: BTreeMap<&'a str, Slot<'a>>,
}

impl<'a> Bindings<'a> {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a slot, replacing any previous binding
    pub fn bind(&mut self, key: &'a str, slot: Slot<'a>) {
        self.slots.insert(key, slot);
    }

    /// Builder form of [`Bindings::bind`]
    pub fn with(mut self, key: &'a str, slot: Slot<'a>) -> Self {
        self.bind(key, slot);
        self
    }

    /// Bind an instance under its own key
    pub fn bind_instance(&mut self, instance: &'a TemplateInstance, template: &'a ParametricTemplate) {
        self.bind(instance.key(), Slot::of_instance(instance, template));
    }

    /// Resolve a slot
    pub fn get(&self, key: &str) -> Result<&Slot<'a>> {
        self.slots
            .get(key)
            .ok_or_else(|| ConstraintError::UnboundSlot(key.to_string()))
    }

    /// Check if a slot is bound
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Bound slot names, ordered
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.slots.keys().copied()
    }
}
