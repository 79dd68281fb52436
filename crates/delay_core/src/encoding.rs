//! Label encoding for categorical trip columns
//!
//! Each encoder maps the sorted set of values seen at training time onto
//! `0..k`. The vocabulary is closed: values outside it are reported as
//! [`CoreError::UnknownCategory`] and never mapped to a fallback code.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::errors::{CoreError, Result};
use crate::record::{canonical_train_number, CATEGORICAL_COLUMNS};

/// Closed-vocabulary label encoder for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Column this encoder belongs to
    pub column: String,
    /// Sorted vocabulary; the code of a value is its position
    classes: Vec<String>,
    /// All classes are integers and are ordered numerically
    numeric: bool,
}

impl LabelEncoder {
    /// Fit an encoder on the given values
    pub fn fit<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .collect();

        let numeric = !unique.is_empty() && unique.iter().all(|v| v.parse::<i64>().is_ok());

        let classes: Vec<String> = if numeric {
            unique
                .iter()
                .filter_map(|v| v.parse::<i64>().ok())
                .collect::<BTreeSet<i64>>()
                .into_iter()
                .map(|n| n.to_string())
                .collect()
        } else {
            unique.into_iter().collect()
        };

        Self {
            column: column.to_string(),
            classes,
            numeric,
        }
    }

    /// Code for a value, or an unknown-category error
    pub fn transform(&self, value: &str) -> Result<i64> {
        let value = value.trim();
        if self.numeric && value.parse::<i64>().is_err() {
            return Err(self.unknown(value));
        }

        self.classes
            .binary_search_by(|probe| compare_values(probe, value, self.numeric))
            .map(|idx| idx as i64)
            .map_err(|_| self.unknown(value))
    }

    /// Value for a code, if the code is inside the vocabulary
    pub fn inverse(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn unknown(&self, value: &str) -> CoreError {
        CoreError::UnknownCategory {
            column: self.column.clone(),
            value: value.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.numeric && self.classes.iter().any(|v| v.parse::<i64>().is_err()) {
            return Err(CoreError::ValidationFailed(format!(
                "encoder '{}' is numeric but holds non-integer classes",
                self.column
            )));
        }

        let sorted = self
            .classes
            .windows(2)
            .all(|pair| compare_values(&pair[0], &pair[1], self.numeric) == Ordering::Less);
        if !sorted {
            return Err(CoreError::ValidationFailed(format!(
                "encoder '{}' classes are not strictly sorted",
                self.column
            )));
        }

        Ok(())
    }
}

fn compare_values(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        if let (Ok(x), Ok(y)) = (a.parse::<i64>(), b.parse::<i64>()) {
            return x.cmp(&y);
        }
    }
    a.cmp(b)
}

/// Encoders for the three categorical trip columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalEncoders {
    pub train_number: LabelEncoder,
    pub from_station: LabelEncoder,
    pub to_station: LabelEncoder,
}

impl CategoricalEncoders {
    /// Fit all encoders from `(train_number, from_station, to_station)` rows
    pub fn fit<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut trains = Vec::new();
        let mut origins = Vec::new();
        let mut destinations = Vec::new();

        for (train, from, to) in rows {
            trains.push(canonical_train_number(train));
            origins.push(from);
            destinations.push(to);
        }

        Self {
            train_number: LabelEncoder::fit(CATEGORICAL_COLUMNS[0], trains),
            from_station: LabelEncoder::fit(CATEGORICAL_COLUMNS[1], origins),
            to_station: LabelEncoder::fit(CATEGORICAL_COLUMNS[2], destinations),
        }
    }

    /// Encode a row; the first unknown value (in column order) is reported
    pub fn encode(&self, train_number: &str, from_station: &str, to_station: &str) -> Result<[i64; 3]> {
        Ok([
            self.train_number
                .transform(&canonical_train_number(train_number))?,
            self.from_station.transform(from_station)?,
            self.to_station.transform(to_station)?,
        ])
    }

    /// Encoders in column order
    pub fn iter(&self) -> impl Iterator<Item = &LabelEncoder> {
        [&self.train_number, &self.from_station, &self.to_station].into_iter()
    }

    pub fn validate(&self) -> Result<()> {
        for (encoder, column) in self.iter().zip(CATEGORICAL_COLUMNS) {
            if encoder.column != column {
                return Err(CoreError::ValidationFailed(format!(
                    "expected encoder for '{}', found '{}'",
                    column, encoder.column
                )));
            }
            encoder.validate()?;
        }
        Ok(())
    }
}
