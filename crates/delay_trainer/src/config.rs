//! Training configuration
//!
//! Parameters are plain floats and counts so they read naturally in a TOML
//! file; the trainer converts fractions and penalties to fixed-point once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::errors::{Result, TrainerError};

/// Loss minimised by the trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Absolute error; leaves are renewed to residual medians
    L1,
    /// Squared error
    L2,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::L1 => write!(f, "l1"),
            Objective::L2 => write!(f, "l2"),
        }
    }
}

impl FromStr for Objective {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "l1" | "regression_l1" | "mae" => Ok(Objective::L1),
            "l2" | "regression" | "mse" => Ok(Objective::L2),
            other => Err(TrainerError::Config(format!("unknown objective '{other}'"))),
        }
    }
}

/// GBDT training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub objective: Objective,
    /// Maximum number of boosting rounds
    pub num_rounds: usize,
    pub learning_rate: f64,
    /// Leaf-wise growth stops at this many leaves per tree
    pub num_leaves: usize,
    /// 0 means unlimited
    pub max_depth: usize,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian_in_leaf: f64,
    /// Share of features considered per tree
    pub feature_fraction: f64,
    /// Share of rows used per bagging round
    pub bagging_fraction: f64,
    /// Resample rows every k rounds; 0 disables bagging
    pub bagging_freq: usize,
    pub lambda_l1: f64,
    pub lambda_l2: f64,
    /// Stop after this many rounds without evaluation improvement; 0 disables
    pub early_stopping_rounds: usize,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Feature bin width for split candidates
    pub quant_step: i64,
    pub seed: i64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            objective: Objective::L1,
            num_rounds: 2000,
            learning_rate: 0.01,
            num_leaves: 31,
            max_depth: 0,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            feature_fraction: 0.8,
            bagging_fraction: 0.8,
            bagging_freq: 1,
            lambda_l1: 0.1,
            lambda_l2: 0.1,
            early_stopping_rounds: 100,
            test_fraction: 0.2,
            quant_step: 1,
            seed: 42,
        }
    }
}

impl TrainingParams {
    /// Parse parameters from TOML text; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let params: TrainingParams = toml::from_str(content)
            .map_err(|e| TrainerError::Config(format!("failed to parse config: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading training configuration from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        let fraction_ok = |v: f64| v > 0.0 && v <= 1.0;

        if self.num_rounds == 0 {
            return Err(TrainerError::Config("num_rounds must be positive".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(TrainerError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.num_leaves < 2 {
            return Err(TrainerError::Config("num_leaves must be at least 2".into()));
        }
        if self.min_data_in_leaf == 0 {
            return Err(TrainerError::Config("min_data_in_leaf must be positive".into()));
        }
        if !fraction_ok(self.feature_fraction) {
            return Err(TrainerError::Config(format!(
                "feature_fraction must be in (0, 1], got {}",
                self.feature_fraction
            )));
        }
        if !fraction_ok(self.bagging_fraction) {
            return Err(TrainerError::Config(format!(
                "bagging_fraction must be in (0, 1], got {}",
                self.bagging_fraction
            )));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(TrainerError::Config(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.lambda_l1 < 0.0 || self.lambda_l2 < 0.0 || self.min_sum_hessian_in_leaf < 0.0 {
            return Err(TrainerError::Config("penalties must be non-negative".into()));
        }
        if self.quant_step <= 0 {
            return Err(TrainerError::Config("quant_step must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = TrainingParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.objective, Objective::L1);
        assert_eq!(params.num_leaves, 31);
        assert_eq!(params.seed, 42);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let params = TrainingParams::from_toml_str(
            r#"
            objective = "l2"
            num_rounds = 50
            learning_rate = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(params.objective, Objective::L2);
        assert_eq!(params.num_rounds, 50);
        assert_eq!(params.num_leaves, 31);
        assert_eq!(params.early_stopping_rounds, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrainingParams::from_toml_str("feature_fraction = 0.0").is_err());
        assert!(TrainingParams::from_toml_str("test_fraction = 1.0").is_err());
        assert!(TrainingParams::from_toml_str("num_leaves = 1").is_err());
        assert!(TrainingParams::from_toml_str("objective = \"huber\"").is_err());
    }

    #[test]
    fn test_objective_from_str() {
        assert_eq!("regression_l1".parse::<Objective>().unwrap(), Objective::L1);
        assert_eq!("MSE".parse::<Objective>().unwrap(), Objective::L2);
        assert!("poisson".parse::<Objective>().is_err());
        assert_eq!(Objective::L1.to_string(), "l1");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let params =
            TrainingParams::from_toml_str(include_str!("../../../config/training.toml")).unwrap();
        assert_eq!(params, TrainingParams::default());
    }
}
