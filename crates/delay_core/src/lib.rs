//! Train delay prediction core
//!
//! Data model, feature derivation and integer-only model evaluation for
//! predicting train arrival delay in minutes.
//!
//! Modules:
//! - `record`: Trip fields, date/time parsing and derived schedule features
//! - `encoding`: Closed-vocabulary label encoders for categorical columns
//! - `gbdt`: Fixed-point regression trees and model scoring
//! - `predictor`: Model + encoders bundle used for single-trip inference
//! - `serialization`: Canonical JSON and BLAKE3 hashing helpers
//! - `errors`: Error types

pub mod encoding;
pub mod errors;
pub mod gbdt;
pub mod predictor;
pub mod record;
pub mod serialization;

pub use encoding::{CategoricalEncoders, LabelEncoder};
pub use errors::{CoreError, Result};
pub use gbdt::{Model, Node, Tree, SCALE};
pub use predictor::{DelayPredictor, PredictorMetadata};
pub use record::{
    CalendarFeatures, TripFeatures, TripQuery, CATEGORICAL_COLUMNS, FEATURE_COLUMNS,
    FEATURE_COUNT, TARGET_COLUMN,
};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Predict the delay for a raw trip query, clamped to zero minutes
pub fn predict_delay(predictor: &DelayPredictor, query: &TripQuery) -> Result<f64> {
    predictor.predict(query)
}
