// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recognizer options

use crate::error::{RecognizeError, Result};
use serde::{Deserialize, Serialize};

/// Recognizer options
///
/// The distance between two elements is a weighted mean of a shape term
/// (section samples and fill ratio) and a dimension term (largest relative
/// difference of the principal extents and key numeric properties), both in
/// `[0, 1]`. Clusters merge while their centroid distance stays within
/// `similarity_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerOptions {
    /// Maximum centroid distance for two clusters to merge
    pub similarity_threshold: f64,
    /// Minimum cluster size that yields a template
    pub min_support: usize,
    /// Variance at or below which a feature is a constant
    pub invariance_epsilon: f64,
    /// Factor by which observed ranges are widened into declared domains
    pub domain_expansion: f64,
    /// Weight of the shape-profile term
    pub shape_weight: f64,
    /// Weight of the dimensional-ratio term
    pub dimension_weight: f64,
    /// Properties that take part in the signature
    pub key_properties: Vec<String>,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.15,
            min_support: 2,
            invariance_epsilon: 1e-6,
            domain_expansion: 2.0,
            shape_weight: 0.5,
            dimension_weight: 0.5,
            key_properties: Vec::new(),
        }
    }
}

impl RecognizerOptions {
    /// Tight families, only near-identical elements merge
    pub fn strict() -> Self {
        Self {
            similarity_threshold: 0.05,
            min_support: 3,
            ..Self::default()
        }
    }

    /// Broad families
    pub fn loose() -> Self {
        Self {
            similarity_threshold: 0.3,
            ..Self::default()
        }
    }

    /// Set the similarity threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the minimum support
    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.min_support = min_support;
        self
    }

    /// Add a key property to the signature
    pub fn with_key_property(mut self, name: impl Into<String>) -> Self {
        self.key_properties.push(name.into());
        self
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if !self.similarity_threshold.is_finite() || self.similarity_threshold <= 0.0 {
            return Err(RecognizeError::options("similarity threshold must be positive"));
        }
        if self.min_support == 0 {
            return Err(RecognizeError::options("minimum support must be at least 1"));
        }
        if !self.invariance_epsilon.is_finite() || self.invariance_epsilon < 0.0 {
            return Err(RecognizeError::options("invariance epsilon must be non-negative"));
        }
        if !self.domain_expansion.is_finite() || self.domain_expansion < 1.0 {
            return Err(RecognizeError::options("domain expansion must be at least 1"));
        }
        let weights = [self.shape_weight, self.dimension_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecognizeError::options("weights must be non-negative"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(RecognizeError::options("weights must not all be zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(RecognizerOptions::default().validate().is_ok());
        assert!(RecognizerOptions::strict().validate().is_ok());
        assert!(RecognizerOptions::loose().validate().is_ok());
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(RecognizerOptions::default().with_threshold(0.0).validate().is_err());
        assert!(RecognizerOptions::default().with_min_support(0).validate().is_err());
        let zero_weights = RecognizerOptions {
            shape_weight: 0.0,
            dimension_weight: 0.0,
            ..RecognizerOptions::default()
        };
        assert!(zero_weights.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: RecognizerOptions =
            serde_json::from_str(r#"{"similarity_threshold": 0.2}"#).unwrap();
        assert_eq!(options.similarity_threshold, 0.2);
        assert_eq!(options.min_support, 2);
    }
}
