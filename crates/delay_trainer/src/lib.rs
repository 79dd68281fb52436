//! Train delay trainer
//!
//! Preprocesses a trip history CSV, trains a deterministic fixed-point
//! GBDT regressor on it and packages the result with its label encoders
//! as a [`DelayPredictor`].

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod metrics;
pub mod objective;
pub mod prompt;
pub mod trainer;

use delay_core::{CategoricalEncoders, DelayPredictor, PredictorMetadata};
use std::path::Path;
use tracing::info;

pub use config::{Objective, TrainingParams};
pub use dataset::{preprocess_data, preprocess_reader, Dataset};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::{Result, TrainerError};
pub use metrics::RegressionMetrics;
pub use trainer::{GbdtTrainer, TrainingOutcome};

/// Split off the evaluation rows and train a model on the rest
pub fn train_model(dataset: &Dataset, params: &TrainingParams) -> Result<TrainingOutcome> {
    params.validate()?;

    let (train, test) = dataset.train_test_split(params.test_fraction, params.seed)?;
    info!("Training on {} rows, evaluating on {}", train.len(), test.len());

    GbdtTrainer::new(params.clone()).train(&train, Some(&test))
}

/// Bundle a training outcome with the encoders used to build its features
pub fn package_predictor(
    outcome: &TrainingOutcome,
    encoders: CategoricalEncoders,
    params: &TrainingParams,
) -> DelayPredictor {
    let metadata = PredictorMetadata {
        objective: params.objective.to_string(),
        best_round: outcome.best_round,
        train_rows: outcome.train_metrics.rows,
        validation_rmse: outcome.validation_metrics.map(|m| m.rmse),
        created_at: chrono::Utc::now().timestamp(),
    };

    DelayPredictor::new(outcome.model.clone(), encoders, metadata)
}

/// Preprocess the CSV at `path`, train, and return a ready predictor
pub fn build_predictor(path: &Path, params: &TrainingParams) -> Result<(DelayPredictor, TrainingOutcome)> {
    let (dataset, encoders) = preprocess_data(path)?;
    let outcome = train_model(&dataset, params)?;
    let predictor = package_predictor(&outcome, encoders, params);
    Ok((predictor, outcome))
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
