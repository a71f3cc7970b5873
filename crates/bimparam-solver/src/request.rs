// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Self-contained solve requests

use bimparam_constraints::ConstraintSet;
use bimparam_model::{
    InstanceId, ParameterValues, ParametricTemplate, Placement, TemplateInstance,
    VersionedTemplate,
};
use std::sync::Arc;

/// Already solved instance that constraints may refer to
#[derive(Debug, Clone, PartialEq)]
pub struct ContextInstance {
    pub instance: TemplateInstance,
    pub template: Arc<ParametricTemplate>,
}

/// Everything needed to produce one instance
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    /// Template version to instantiate
    pub template: VersionedTemplate,
    /// Key of the new instance; constraints address it by this name
    pub key: String,
    pub constraints: ConstraintSet,
    /// Preferred values; parameters not listed start from their defaults
    pub seed: ParameterValues,
    pub placement: Placement,
    /// Instances the constraints may relate the new one to
    pub context: Vec<ContextInstance>,
    /// Instance this solve replaces
    pub supersedes: Option<InstanceId>,
}

impl SolveRequest {
    /// Request for a fresh instance
    pub fn new(template: VersionedTemplate, key: impl Into<String>) -> Self {
        Self {
            template,
            key: key.into(),
            constraints: ConstraintSet::new(),
            seed: ParameterValues::new(),
            placement: Placement::default(),
            context: Vec::new(),
            supersedes: None,
        }
    }

    /// Request for the next revision of an existing instance
    ///
    /// Key and placement are kept and the previous values seed the search.
    pub fn revision_of(previous: &TemplateInstance, template: VersionedTemplate) -> Self {
        Self {
            seed: previous.parameters.clone(),
            placement: previous.placement,
            supersedes: Some(previous.id.clone()),
            ..Self::new(template, previous.key())
        }
    }

    /// Set the constraints
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set a seed value
    pub fn with_seed(mut self, name: impl Into<String>, value: f64) -> Self {
        self.seed.insert(name.into(), value);
        self
    }

    /// Replace all seed values
    pub fn with_seeds(mut self, seed: ParameterValues) -> Self {
        self.seed = seed;
        self
    }

    /// Set the placement
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Add a context instance
    pub fn with_context(mut self, instance: TemplateInstance, template: Arc<ParametricTemplate>) -> Self {
        self.context.push(ContextInstance { instance, template });
        self
    }

    /// Identifier the solved instance will get
    pub fn instance_id(&self) -> InstanceId {
        match &self.supersedes {
            Some(previous) => previous.next(),
            None => InstanceId::new(self.key.as_str()),
        }
    }
}
