//! GBDT delay model with fixed-point inference
//!
//! The model score is `bias + Σ leaf * weight / scale`, computed with
//! integer arithmetic only. Scores are delay minutes at `scale` precision.

use serde::{Deserialize, Serialize};

use super::tree::Tree;
use crate::errors::{CoreError, Result};
use crate::serialization::hash_canonical_hex;

/// Default scale factor for fixed-point arithmetic (1e6)
pub const SCALE: i64 = 1_000_000;

/// Current model format version
pub const MODEL_VERSION: i32 = 1;

/// Convert a float to fixed-point at `SCALE`, rounding to nearest
pub fn to_fixed(value: f64) -> i64 {
    (value * SCALE as f64).round() as i64
}

/// Convert a fixed-point value at `SCALE` back to a float
pub fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Regression model over a fixed-length integer feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    pub version: i32,

    /// Fixed-point scale of bias, leaf values and tree weights
    pub scale: i64,

    /// Number of input features every tree may index
    pub feature_count: usize,

    pub trees: Vec<Tree>,

    /// Initial score (fixed-point)
    pub bias: i64,
}

impl Model {
    pub fn new(trees: Vec<Tree>, bias: i64, feature_count: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            trees,
            bias,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(CoreError::ValidationFailed(format!(
                "unsupported model version: {}",
                self.version
            )));
        }

        if self.scale <= 0 {
            return Err(CoreError::ValidationFailed(format!(
                "invalid scale: {}",
                self.scale
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                CoreError::ValidationFailed(format!("tree {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }

    /// Fixed-point score for a feature vector
    pub fn score(&self, features: &[i64]) -> i64 {
        self.score_first(features, self.trees.len())
    }

    /// Score using only the first `num_trees` trees
    pub fn score_first(&self, features: &[i64], num_trees: usize) -> i64 {
        let mut sum = i128::from(self.bias);

        for tree in self.trees.iter().take(num_trees) {
            let weighted = i128::from(tree.evaluate(features)) * i128::from(tree.weight);
            sum += weighted / i128::from(self.scale);
        }

        sum.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Raw score converted to minutes
    pub fn predict(&self, features: &[i64]) -> f64 {
        self.score(features) as f64 / self.scale as f64
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// BLAKE3 hash of the canonical JSON form, hex encoded
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }
}
