//! Regression metrics in minutes

use delay_core::gbdt::from_fixed;
use delay_core::Model;

use crate::dataset::Dataset;

/// Error summary of a model on a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub rows: usize,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    /// Metrics from fixed-point scores and targets
    pub fn from_fixed(scores: &[i64], targets: &[i64]) -> Self {
        let rows = scores.len().min(targets.len());
        if rows == 0 {
            return Self {
                rows: 0,
                rmse: 0.0,
                mae: 0.0,
            };
        }

        let (sq, abs) = scores
            .iter()
            .zip(targets)
            .fold((0.0f64, 0.0f64), |(sq, abs), (&s, &t)| {
                let err = from_fixed(s) - from_fixed(t);
                (sq + err * err, abs + err.abs())
            });

        Self {
            rows,
            rmse: (sq / rows as f64).sqrt(),
            mae: abs / rows as f64,
        }
    }

    /// Evaluate a model on every row of a dataset
    pub fn evaluate(model: &Model, dataset: &Dataset) -> Self {
        let scores: Vec<i64> = dataset.features.iter().map(|row| model.score(row)).collect();
        Self::from_fixed(&scores, &dataset.targets)
    }
}

/// Sum of squared fixed-point errors, used to rank boosting rounds exactly
pub fn squared_error_sum(scores: &[i64], targets: &[i64]) -> i128 {
    scores
        .iter()
        .zip(targets)
        .map(|(&s, &t)| {
            let err = i128::from(s) - i128::from(t);
            err * err
        })
        .sum()
}
