use std::path::PathBuf;
use thiserror::Error;

use delay_core::CoreError;

/// Errors returned by preprocessing and the deterministic trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("The data file '{}' was not found.", .0.display())]
    DataFileNotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;
