//! CSV loading and feature preprocessing
//!
//! Reads the trip history, derives the schedule features, fits the
//! categorical encoders and produces an integer feature matrix with
//! fixed-point delay targets. Also provides deterministic shuffling and
//! the train/evaluation split.

use delay_core::gbdt::to_fixed;
use delay_core::record::{
    canonical_train_number, parse_date, parse_hour, parse_hour_lenient, validate_weather,
};
use delay_core::{CategoricalEncoders, TripFeatures, FEATURE_COUNT};
use serde::Deserialize;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// One CSV row as stored on disk
#[derive(Debug, Clone, Deserialize)]
pub struct TripRow {
    pub date: String,
    pub train_number: String,
    pub from_station: String,
    pub to_station: String,
    #[serde(default)]
    pub scheduled_departure: Option<String>,
    #[serde(default)]
    pub scheduled_arrival: Option<String>,
    pub weather_condition: String,
    pub actual_delay_minutes: String,
}

/// Training dataset with integer features and fixed-point targets
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub features: Vec<Vec<i64>>,
    pub targets: Vec<i64>,
    pub feature_count: usize,
}

/// Load the CSV at `path` and preprocess it
pub fn preprocess_data<P: AsRef<Path>>(path: P) -> Result<(Dataset, CategoricalEncoders)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => TrainerError::DataFileNotFound(path.to_path_buf()),
        _ => TrainerError::Io(err),
    })?;

    info!("Loading dataset from: {}", path.display());
    preprocess_reader(file)
}

/// Preprocess CSV content from any reader (header row required)
pub fn preprocess_reader<R: Read>(reader: R) -> Result<(Dataset, CategoricalEncoders)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<TripRow>() {
        rows.push(record?);
    }

    preprocess_rows(&rows)
}

/// Largest accepted |target|; keeps fixed-point targets and squared
/// error sums far from integer overflow
pub const MAX_DELAY_MINUTES: f64 = 1e9;

/// Derive features for parsed rows and fit the categorical encoders
pub fn preprocess_rows(rows: &[TripRow]) -> Result<(Dataset, CategoricalEncoders)> {
    if rows.is_empty() {
        return Err(TrainerError::Dataset("dataset is empty".into()));
    }

    let encoders = CategoricalEncoders::fit(rows.iter().map(|r| {
        (
            r.train_number.as_str(),
            r.from_station.as_str(),
            r.to_station.as_str(),
        )
    }));

    let mut dataset = Dataset {
        features: Vec::with_capacity(rows.len()),
        targets: Vec::with_capacity(rows.len()),
        feature_count: FEATURE_COUNT,
    };
    let mut coerced_hours = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let row_err = |message: String| TrainerError::Row { row: line, message };

        let date = parse_date(&row.date).map_err(|e| row_err(e.to_string()))?;

        let mut hour = |value: &Option<String>| {
            let text = value.as_deref().unwrap_or("");
            if parse_hour(text).is_err() {
                coerced_hours += 1;
            }
            parse_hour_lenient(text)
        };
        let departure = hour(&row.scheduled_departure);
        let arrival = hour(&row.scheduled_arrival);

        let weather = parse_integer(&row.weather_condition)
            .ok_or_else(|| row_err(format!("invalid weather_condition '{}'", row.weather_condition)))
            .and_then(|w| validate_weather(w).map_err(|e| row_err(e.to_string())))?;

        let minutes: f64 = row
            .actual_delay_minutes
            .parse()
            .map_err(|_| row_err(format!("invalid actual_delay_minutes '{}'", row.actual_delay_minutes)))?;
        if !minutes.is_finite() {
            return Err(row_err(format!("non-finite actual_delay_minutes '{}'", row.actual_delay_minutes)));
        }
        if minutes.abs() > MAX_DELAY_MINUTES {
            return Err(row_err(format!(
                "actual_delay_minutes '{}' is outside +/-{} minutes",
                row.actual_delay_minutes, MAX_DELAY_MINUTES
            )));
        }

        let codes = encoders.encode(
            &canonical_train_number(&row.train_number),
            &row.from_station,
            &row.to_station,
        )?;

        let features = TripFeatures::new(codes, date, departure, arrival, weather);
        dataset.features.push(features.to_vector().to_vec());
        dataset.targets.push(to_fixed(minutes));
    }

    if coerced_hours > 0 {
        warn!("{} scheduled times were missing or not HH:MM and were set to hour 0", coerced_hours);
    }

    info!(
        "Preprocessed {} rows: {} trains, {} origins, {} destinations",
        dataset.len(),
        encoders.train_number.len(),
        encoders.from_station.len(),
        encoders.to_station.len()
    );

    Ok((dataset, encoders))
}

/// Integers, also accepting integral floats such as `1.0`
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

impl Dataset {
    /// Deterministically shuffle the dataset using seed
    pub fn shuffle(&mut self, seed: i64) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        LcgRng::new(seed).shuffle(&mut order);
        *self = self.subset(&order);
    }

    /// Rows at the given indices, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_count: self.feature_count,
        }
    }

    /// Shuffle a copy and split off `ceil(n * test_fraction)` rows for evaluation
    pub fn train_test_split(&self, test_fraction: f64, seed: i64) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(TrainerError::Dataset(format!(
                "test fraction must be in [0, 1), got {test_fraction}"
            )));
        }

        let n = self.len();
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test >= n {
            return Err(TrainerError::Dataset(format!(
                "{n} rows leave no training data with test fraction {test_fraction}"
            )));
        }

        let mut shuffled = self.clone();
        shuffled.shuffle(seed);

        let test_idx: Vec<usize> = (0..n_test).collect();
        let train_idx: Vec<usize> = (n_test..n).collect();
        let split = (shuffled.subset(&train_idx), shuffled.subset(&test_idx));

        debug!("Split {} rows into {} train / {} test", n, split.0.len(), split.1.len());
        Ok(split)
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Get feature statistics (min, max) per column
    pub fn feature_stats(&self) -> Vec<(i64, i64)> {
        let mut stats = vec![(i64::MAX, i64::MIN); self.feature_count];

        for row in &self.features {
            for (i, &val) in row.iter().enumerate() {
                stats[i].0 = stats[i].0.min(val);
                stats[i].1 = stats[i].1.max(val);
            }
        }

        stats
    }
}
