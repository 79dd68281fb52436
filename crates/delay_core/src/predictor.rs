//! Trained predictor bundle: model plus the encoders it was trained with
//!
//! A `DelayPredictor` is what the trainer hands to inference. It can be
//! saved as canonical JSON next to a BLAKE3 hash file and loaded back with
//! the hash verified.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::encoding::CategoricalEncoders;
use crate::errors::{CoreError, Result};
use crate::gbdt::Model;
use crate::record::{
    parse_date, parse_hour, validate_weather, TripFeatures, TripQuery, FEATURE_COLUMNS,
    FEATURE_COUNT,
};
use crate::serialization::{canonical_json_string, hash_json_hex};

/// File name of a saved predictor inside its output directory
pub const PREDICTOR_FILE: &str = "predictor.json";

/// File name of the predictor's hash inside its output directory
pub const HASH_FILE: &str = "predictor.hash";

/// Training provenance stored with the predictor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorMetadata {
    /// Objective the model was fitted with (`l1` or `l2`)
    pub objective: String,
    /// Number of boosting rounds kept after early stopping
    pub best_round: usize,
    /// Rows used for fitting
    pub train_rows: usize,
    /// Evaluation RMSE in minutes at `best_round`, when an evaluation set existed
    pub validation_rmse: Option<f64>,
    /// Unix timestamp of training
    pub created_at: i64,
}

/// Model and categorical encoders needed to score a raw trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayPredictor {
    pub model: Model,
    pub encoders: CategoricalEncoders,
    pub feature_columns: Vec<String>,
    pub metadata: PredictorMetadata,
}

impl DelayPredictor {
    pub fn new(model: Model, encoders: CategoricalEncoders, metadata: PredictorMetadata) -> Self {
        Self {
            model,
            encoders,
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            metadata,
        }
    }

    /// Derive and encode the feature row for a query
    ///
    /// Dates and times are parsed strictly here; the lenient hour parsing
    /// is a training-time behaviour only.
    pub fn features_for(&self, query: &TripQuery) -> Result<TripFeatures> {
        let date = parse_date(&query.date)?;
        let departure = parse_hour(&query.scheduled_departure)?;
        let arrival = parse_hour(&query.scheduled_arrival)?;
        let weather = validate_weather(query.weather_condition)?;

        let codes = self.encoders.encode(
            &query.train_number,
            &query.from_station,
            &query.to_station,
        )?;

        Ok(TripFeatures::new(codes, date, departure, arrival, weather))
    }

    /// Predicted delay in minutes, never negative
    pub fn predict(&self, query: &TripQuery) -> Result<f64> {
        let features = self.features_for(query)?;
        let raw = self.model.predict(&features.to_vector());
        debug!(raw, "raw model output");
        Ok(raw.max(0.0))
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.encoders.validate()?;

        if self.model.feature_count != FEATURE_COUNT {
            return Err(CoreError::ValidationFailed(format!(
                "model expects {} features, predictor provides {}",
                self.model.feature_count, FEATURE_COUNT
            )));
        }

        if self.feature_columns.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
            return Err(CoreError::ValidationFailed(format!(
                "unexpected feature columns: {:?}",
                self.feature_columns
            )));
        }

        Ok(())
    }

    /// Write `predictor.json` and `predictor.hash` into `dir`; returns the hash
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<String> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let json = canonical_json_string(self)?;
        let hash = hash_json_hex(&json);

        let model_path = dir.join(PREDICTOR_FILE);
        fs::write(&model_path, &json)?;
        fs::write(dir.join(HASH_FILE), &hash)?;

        info!("Saved predictor to {} ({})", model_path.display(), hash);
        Ok(hash)
    }

    /// Load a predictor, verifying the sibling hash file when present
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;

        let hash_path = hash_path_for(path);
        if hash_path.exists() {
            let expected = fs::read_to_string(&hash_path)?.trim().to_string();
            let actual = hash_json_hex(&json);
            if expected != actual {
                return Err(CoreError::HashMismatch { expected, actual });
            }
            debug!("Verified predictor hash {}", actual);
        }

        let predictor: DelayPredictor = serde_json::from_str(&json)?;
        predictor.validate()?;
        Ok(predictor)
    }
}

fn hash_path_for(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if path.file_name().map_or(false, |name| name == PREDICTOR_FILE) => {
            dir.join(HASH_FILE)
        }
        _ => path.with_extension("hash"),
    }
}
