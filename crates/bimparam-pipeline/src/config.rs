// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline configuration

use crate::error::{PipelineError, Result};
use bimparam_geometry::{AlignmentOptions, TilingOptions};
use bimparam_normalizer::NormalizerOptions;
use bimparam_recognizer::RecognizerOptions;
use bimparam_solver::SolverOptions;
use bimparam_validator::ValidatorOptions;
use serde::{Deserialize, Serialize};

/// Options for every stage, loadable from JSON
///
/// Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalizer: NormalizerOptions,
    pub recognizer: RecognizerOptions,
    pub solver: SolverOptions,
    pub validator: ValidatorOptions,
    pub tiling: TilingOptions,
    pub alignment: AlignmentOptions,
}

impl PipelineConfig {
    /// Tight clustering and tolerances, large solver budget
    pub fn strict() -> Self {
        Self {
            recognizer: RecognizerOptions::strict(),
            solver: SolverOptions::thorough(),
            validator: ValidatorOptions::strict(),
            ..Self::default()
        }
    }

    /// Coarse sampling and a small solver budget
    pub fn fast() -> Self {
        Self {
            normalizer: NormalizerOptions::fast(),
            solver: SolverOptions::fast(),
            ..Self::default()
        }
    }

    pub fn with_recognizer(mut self, recognizer: RecognizerOptions) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_validator(mut self, validator: ValidatorOptions) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_tiling(mut self, tiling: TilingOptions) -> Self {
        self.tiling = tiling;
        self
    }

    pub fn with_alignment(mut self, alignment: AlignmentOptions) -> Self {
        self.alignment = alignment;
        self
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.normalizer.validate()?;
        self.recognizer.validate()?;
        self.solver.validate()?;
        self.validator.validate()?;
        self.tiling.validate()?;
        self.alignment.validate()?;
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(PipelineError::from)
    }
}
