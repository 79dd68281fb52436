//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Deterministic boosting with fixed-point arithmetic: seeded row bagging
//! and feature sampling, leaf-wise trees, residual-median leaf renewal for
//! the L1 objective and early stopping on a held-out evaluation set.

use delay_core::gbdt::{to_fixed, Model, Tree};
use tracing::{debug, info};

use crate::cart::{CartBuilder, GrownTree, TreeConfig};
use crate::config::TrainingParams;
use crate::dataset::Dataset;
use crate::deterministic::{fraction_count, LcgRng};
use crate::errors::{Result, TrainerError};
use crate::metrics::{squared_error_sum, RegressionMetrics};
use crate::objective::median;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: Model,
    /// Rounds kept in the model (after early-stopping truncation)
    pub best_round: usize,
    /// Rounds actually run
    pub rounds_run: usize,
    pub train_metrics: RegressionMetrics,
    pub validation_metrics: Option<RegressionMetrics>,
}

/// GBDT trainer
pub struct GbdtTrainer {
    params: TrainingParams,
}

impl GbdtTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            num_leaves: self.params.num_leaves,
            max_depth: self.params.max_depth,
            min_data_in_leaf: self.params.min_data_in_leaf,
            min_sum_hessian: to_fixed(self.params.min_sum_hessian_in_leaf),
            lambda_l1: to_fixed(self.params.lambda_l1),
            lambda_l2: to_fixed(self.params.lambda_l2),
            quant_step: self.params.quant_step,
        }
    }

    /// Train a model on `train`, early-stopping on `valid` when it has rows
    pub fn train(&self, train: &Dataset, valid: Option<&Dataset>) -> Result<TrainingOutcome> {
        self.params.validate()?;

        if train.is_empty() {
            return Err(TrainerError::Training("training set is empty".into()));
        }
        let feature_count = train.feature_count;
        if train.features.iter().any(|row| row.len() != feature_count) {
            return Err(TrainerError::Training("ragged feature rows".into()));
        }
        let valid = valid.filter(|v| !v.is_empty());
        if let Some(v) = valid {
            if v.feature_count != feature_count {
                return Err(TrainerError::Training(format!(
                    "evaluation set has {} features, training set {}",
                    v.feature_count, feature_count
                )));
            }
        }

        let params = &self.params;
        let objective = params.objective;
        let weight = to_fixed(params.learning_rate);
        let tree_config = self.tree_config();
        let n = train.len();

        let bias = objective.init_score(&train.targets);
        let mut scores = vec![bias; n];
        let mut valid_scores = valid.map(|v| vec![bias; v.len()]).unwrap_or_default();

        let mut gradients = vec![0i64; n];
        let mut hessians = vec![0i64; n];
        let mut rng = LcgRng::new(params.seed);
        let all_rows: Vec<usize> = (0..n).collect();
        let all_features: Vec<usize> = (0..feature_count).collect();
        let mut bag = all_rows.clone();

        let mut trees: Vec<Tree> = Vec::new();
        let mut best_error = i128::MAX;
        let mut best_round = 0usize;
        let mut rounds_without_improvement = 0usize;

        info!(
            "Training up to {} rounds on {} rows ({} objective, learning rate {})",
            params.num_rounds, n, objective, params.learning_rate
        );

        for round in 0..params.num_rounds {
            if params.bagging_freq > 0
                && params.bagging_fraction < 1.0
                && round % params.bagging_freq == 0
            {
                bag = rng.sample_indices(n, fraction_count(n, params.bagging_fraction));
            }

            let features = if params.feature_fraction < 1.0 {
                rng.sample_indices(
                    feature_count,
                    fraction_count(feature_count, params.feature_fraction),
                )
            } else {
                all_features.clone()
            };

            objective.gradients(&train.targets, &scores, &mut gradients, &mut hessians);

            let builder =
                CartBuilder::new(&train.features, &gradients, &hessians, tree_config.clone());
            let mut grown = builder.build(&bag, &features);

            if grown.num_leaves() <= 1 {
                info!("Stopped at round {}: no split meets the growth constraints", round + 1);
                break;
            }

            if objective.renews_leaves() {
                renew_leaves(&mut grown, &train.targets, &scores);
            }

            let tree = Tree::new(grown.nodes, weight);
            apply_tree(&tree, &train.features, &mut scores);
            trees.push(tree);

            let Some(v) = valid else {
                best_round = trees.len();
                if (round + 1) % 100 == 0 {
                    debug!("Round {}", round + 1);
                }
                continue;
            };

            apply_tree(&trees[trees.len() - 1], &v.features, &mut valid_scores);
            let error = squared_error_sum(&valid_scores, &v.targets);

            if (round + 1) % 100 == 0 {
                let rmse = RegressionMetrics::from_fixed(&valid_scores, &v.targets).rmse;
                debug!("Round {}: validation rmse {:.4}", round + 1, rmse);
            }

            if error < best_error {
                best_error = error;
                best_round = trees.len();
                rounds_without_improvement = 0;
            } else {
                rounds_without_improvement += 1;
                if params.early_stopping_rounds > 0
                    && rounds_without_improvement >= params.early_stopping_rounds
                {
                    info!(
                        "Early stopping at round {}, best round {}",
                        round + 1,
                        best_round
                    );
                    break;
                }
            }
        }

        let rounds_run = trees.len();
        trees.truncate(best_round);

        let model = Model::new(trees, bias, feature_count);
        let train_metrics = RegressionMetrics::evaluate(&model, train);
        let validation_metrics = valid.map(|v| RegressionMetrics::evaluate(&model, v));

        info!(
            "Training complete: {} trees kept, train rmse {:.4}",
            model.num_trees(),
            train_metrics.rmse
        );
        if let Some(m) = &validation_metrics {
            info!("Validation rmse {:.4}, mae {:.4}", m.rmse, m.mae);
        }

        Ok(TrainingOutcome {
            model,
            best_round,
            rounds_run,
            train_metrics,
            validation_metrics,
        })
    }
}

/// Replace each leaf value by the median residual of its rows
fn renew_leaves(grown: &mut GrownTree, targets: &[i64], scores: &[i64]) {
    let renewed: Vec<(usize, i64)> = grown
        .leaves
        .iter()
        .map(|leaf| {
            let mut residuals: Vec<i64> = leaf
                .rows
                .iter()
                .map(|&row| targets[row].saturating_sub(scores[row]))
                .collect();
            (leaf.node, median(&mut residuals))
        })
        .collect();

    for (node, value) in renewed {
        grown.set_leaf_value(node, value);
    }
}

/// Add a tree's weighted output to running scores, matching `Model::score`
fn apply_tree(tree: &Tree, features: &[Vec<i64>], scores: &mut [i64]) {
    let scale = i128::from(delay_core::SCALE);
    for (row, score) in features.iter().zip(scores.iter_mut()) {
        let contribution = i128::from(tree.evaluate(row)) * i128::from(tree.weight) / scale;
        *score = (i128::from(*score) + contribution)
            .clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Objective;
    use delay_core::SCALE;

    /// target = 10 min when feature 0 is high, 2 min otherwise
    fn step_dataset(n: i64) -> Dataset {
        Dataset {
            features: (0..n).map(|i| vec![i % 10, (i * 7) % 5]).collect(),
            targets: (0..n)
                .map(|i| if i % 10 >= 5 { 10 * SCALE } else { 2 * SCALE })
                .collect(),
            feature_count: 2,
        }
    }

    fn params(objective: Objective) -> TrainingParams {
        TrainingParams {
            objective,
            num_rounds: 60,
            learning_rate: 0.3,
            num_leaves: 4,
            min_data_in_leaf: 3,
            feature_fraction: 1.0,
            bagging_fraction: 1.0,
            early_stopping_rounds: 0,
            ..TrainingParams::default()
        }
    }

    #[test]
    fn test_train_learns_step_function() -> Result<()> {
        for objective in [Objective::L1, Objective::L2] {
            let outcome = GbdtTrainer::new(params(objective)).train(&step_dataset(100), None)?;
            let model = &outcome.model;

            assert!(model.num_trees() > 0);
            assert!((model.predict(&[8, 0]) - 10.0).abs() < 0.5, "{objective}");
            assert!((model.predict(&[1, 0]) - 2.0).abs() < 0.5, "{objective}");
            assert!(outcome.train_metrics.rmse < 0.5);
            assert!(outcome.validation_metrics.is_none());
        }
        Ok(())
    }

    #[test]
    fn test_bias_is_median_for_l1() -> Result<()> {
        let mut p = params(Objective::L1);
        p.num_rounds = 1;
        let outcome = GbdtTrainer::new(p).train(&step_dataset(10), None)?;
        assert_eq!(outcome.model.bias, 6 * SCALE);
        Ok(())
    }

    #[test]
    fn test_determinism() -> Result<()> {
        let data = step_dataset(80);
        let p = TrainingParams {
            num_rounds: 30,
            min_data_in_leaf: 3,
            ..TrainingParams::default()
        };

        let model1 = GbdtTrainer::new(p.clone()).train(&data, None)?.model;
        let model2 = GbdtTrainer::new(p).train(&data, None)?.model;

        assert_eq!(model1, model2);
        Ok(())
    }

    #[test]
    fn test_early_stopping_truncates_to_best_round() -> Result<()> {
        let train = step_dataset(60);
        // Evaluation targets disagree with training, so improvement stalls.
        let mut valid = step_dataset(20);
        valid.targets.iter_mut().for_each(|t| *t = 6 * SCALE);

        let p = TrainingParams {
            early_stopping_rounds: 5,
            ..params(Objective::L2)
        };
        let outcome = GbdtTrainer::new(p).train(&train, Some(&valid))?;

        assert!(outcome.rounds_run < 60);
        assert_eq!(outcome.model.num_trees(), outcome.best_round);
        assert_eq!(outcome.rounds_run, outcome.best_round + 5);
        assert!(outcome.validation_metrics.is_some());
        Ok(())
    }

    #[test]
    fn test_constant_target_stops_immediately() -> Result<()> {
        let data = Dataset {
            features: (0..30).map(|i| vec![i]).collect(),
            targets: vec![4 * SCALE; 30],
            feature_count: 1,
        };
        let outcome = GbdtTrainer::new(params(Objective::L2)).train(&data, None)?;

        assert_eq!(outcome.model.num_trees(), 0);
        assert_eq!(outcome.model.score(&[3]), 4 * SCALE);
        Ok(())
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let result = GbdtTrainer::new(TrainingParams::default()).train(&Dataset::default(), None);
        assert!(matches!(result, Err(TrainerError::Training(_))));
    }
}
