//! Trip records and derived schedule features
//!
//! All derived values are small integers: calendar fields from the trip
//! date, hour-of-day from `HH:MM` strings and the scheduled duration in
//! whole hours, wrapped across midnight.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

/// Feature column names in model input order
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "train_number",
    "from_station",
    "to_station",
    "scheduled_departure",
    "scheduled_arrival",
    "weather_condition",
    "day_of_week",
    "month",
    "day_of_year",
    "trip_duration_scheduled",
];

/// Number of model input features
pub const FEATURE_COUNT: usize = 10;

/// Categorical columns, in encoding order
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["train_number", "from_station", "to_station"];

/// Name of the regression target column
pub const TARGET_COLUMN: &str = "actual_delay_minutes";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a calendar date, discarding any time-of-day component
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(datetime.date());
        }
    }

    Err(CoreError::InvalidDate(text.to_string()))
}

/// Parse an `HH:MM` string and return the hour of day
pub fn parse_hour(text: &str) -> Result<i64> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .map(|time| i64::from(time.hour()))
        .map_err(|_| CoreError::InvalidTime(text.to_string()))
}

/// Training-time hour parsing: unparsable or empty values become hour 0
pub fn parse_hour_lenient(text: &str) -> i64 {
    parse_hour(text).unwrap_or(0)
}

/// Scheduled trip duration in hours, wrapped by +24 for overnight trips
pub fn scheduled_duration(departure_hour: i64, arrival_hour: i64) -> i64 {
    let duration = arrival_hour - departure_hour;
    if duration < 0 {
        duration + 24
    } else {
        duration
    }
}

/// Validate the binary weather flag
pub fn validate_weather(flag: i64) -> Result<i64> {
    match flag {
        0 | 1 => Ok(flag),
        other => Err(CoreError::InvalidWeather(other)),
    }
}

/// Canonical form of a train number: integers lose leading zeros
pub fn canonical_train_number(text: &str) -> String {
    let text = text.trim();
    match text.parse::<i64>() {
        Ok(number) => number.to_string(),
        Err(_) => text.to_string(),
    }
}

/// Calendar features derived from a trip date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: i64,
    /// 1..=12
    pub month: i64,
    /// 1..=366
    pub day_of_year: i64,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day_of_week: i64::from(date.weekday().num_days_from_monday()),
            month: i64::from(date.month()),
            day_of_year: i64::from(date.ordinal()),
        }
    }
}

/// Fully derived, encoded feature row for a single trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripFeatures {
    pub train_number: i64,
    pub from_station: i64,
    pub to_station: i64,
    pub scheduled_departure: i64,
    pub scheduled_arrival: i64,
    pub weather_condition: i64,
    pub calendar: CalendarFeatures,
    pub trip_duration_scheduled: i64,
}

impl TripFeatures {
    /// Assemble a feature row from encoded categoricals and schedule fields
    pub fn new(
        codes: [i64; 3],
        date: NaiveDate,
        departure_hour: i64,
        arrival_hour: i64,
        weather_condition: i64,
    ) -> Self {
        Self {
            train_number: codes[0],
            from_station: codes[1],
            to_station: codes[2],
            scheduled_departure: departure_hour,
            scheduled_arrival: arrival_hour,
            weather_condition,
            calendar: CalendarFeatures::from_date(date),
            trip_duration_scheduled: scheduled_duration(departure_hour, arrival_hour),
        }
    }

    /// Feature vector in `FEATURE_COLUMNS` order
    pub fn to_vector(&self) -> [i64; FEATURE_COUNT] {
        [
            self.train_number,
            self.from_station,
            self.to_station,
            self.scheduled_departure,
            self.scheduled_arrival,
            self.weather_condition,
            self.calendar.day_of_week,
            self.calendar.month,
            self.calendar.day_of_year,
            self.trip_duration_scheduled,
        ]
    }
}

/// A trip as entered by a user at prediction time (raw strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripQuery {
    pub date: String,
    pub train_number: String,
    pub from_station: String,
    pub to_station: String,
    pub scheduled_departure: String,
    pub scheduled_arrival: String,
    pub weather_condition: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date(" 2024/03/15 ").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15 08:30:00").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15T08:30:00").unwrap(), expected);
        assert!(parse_date("15.03.2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_parse_hour() {
        assert_eq!(parse_hour("06:45").unwrap(), 6);
        assert_eq!(parse_hour("23:59").unwrap(), 23);
        assert!(parse_hour("24:00").is_err());
        assert!(parse_hour("noon").is_err());
    }

    #[test]
    fn test_lenient_hour_defaults_to_zero() {
        assert_eq!(parse_hour_lenient("17:10"), 17);
        assert_eq!(parse_hour_lenient(""), 0);
        assert_eq!(parse_hour_lenient("not a time"), 0);
    }

    #[test]
    fn test_duration_wraps_overnight() {
        assert_eq!(scheduled_duration(6, 10), 4);
        assert_eq!(scheduled_duration(22, 3), 5);
        assert_eq!(scheduled_duration(12, 12), 0);
        for dep in 0..24 {
            for arr in 0..24 {
                let d = scheduled_duration(dep, arr);
                assert!((0..24).contains(&d));
            }
        }
    }

    #[test]
    fn test_calendar_features() {
        // 2024-03-15 is a Friday, the 75th day of a leap year
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let cal = CalendarFeatures::from_date(date);
        assert_eq!(cal.day_of_week, 4);
        assert_eq!(cal.month, 3);
        assert_eq!(cal.day_of_year, 75);

        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(CalendarFeatures::from_date(monday).day_of_week, 0);
    }

    #[test]
    fn test_weather_flag() {
        assert_eq!(validate_weather(0).unwrap(), 0);
        assert_eq!(validate_weather(1).unwrap(), 1);
        assert!(validate_weather(2).is_err());
        assert!(validate_weather(-1).is_err());
    }

    #[test]
    fn test_canonical_train_number() {
        assert_eq!(canonical_train_number("016031"), "16031");
        assert_eq!(canonical_train_number(" 12622 "), "12622");
        assert_eq!(canonical_train_number("EXP-1"), "EXP-1");
    }

    #[test]
    fn test_feature_vector_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let features = TripFeatures::new([3, 1, 2], date, 22, 4, 1);
        assert_eq!(features.to_vector(), [3, 1, 2, 22, 4, 1, 0, 1, 1, 6]);
        assert_eq!(FEATURE_COLUMNS.len(), features.to_vector().len());
    }
}
