//! Console prompting for a single trip query

use delay_core::{CoreError, TripQuery};
use std::io::{BufRead, Write};

use crate::errors::{Result, TrainerError};

pub const BANNER: &str = "Train Delay Prediction Model";
pub const RULE: &str = "----------------------------";

/// Reads prompt answers from `input`, echoing prompts to `output`
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` without a newline and read one trimmed line
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TrainerError::Input("unexpected end of input".into()));
        }
        Ok(line.trim().to_string())
    }

    fn ask_integer(&mut self, prompt: &str) -> Result<i64> {
        let answer = self.ask(prompt)?;
        answer
            .parse::<i64>()
            .map_err(|_| TrainerError::Input(format!("'{answer}' is not an integer")))
    }

    /// Print the banner and collect every field of a trip query
    pub fn read_query(&mut self) -> Result<TripQuery> {
        writeln!(self.output, "{BANNER}")?;
        writeln!(self.output, "{RULE}")?;

        let date = self.ask("Enter date (YYYY-MM-DD): ")?;
        let train_number = self.ask_integer("Enter train number (e.g., 16031): ")?;
        let from_station = self.ask("Enter from station (e.g., MAS): ")?.to_uppercase();
        let to_station = self.ask("Enter to station (e.g., AJJ): ")?.to_uppercase();
        let scheduled_departure = self.ask("Enter scheduled departure (HH:MM): ")?;
        let scheduled_arrival = self.ask("Enter scheduled arrival (HH:MM): ")?;
        let weather_condition =
            self.ask_integer("Enter weather condition (0 for Clear, 1 for Bad): ")?;

        Ok(TripQuery {
            date,
            train_number: train_number.to_string(),
            from_station,
            to_station,
            scheduled_departure,
            scheduled_arrival,
            weather_condition,
        })
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Console text for a prediction; an unknown category is reported, not raised
pub fn render_prediction(prediction: std::result::Result<f64, CoreError>) -> Result<String> {
    match prediction {
        Ok(minutes) => Ok(format!("\nPredicted Delay: {minutes:.2} minutes")),
        Err(err @ CoreError::UnknownCategory { .. }) => Ok(format!("\n{err}")),
        Err(err) => Err(err.into()),
    }
}

/// Message printed when the CLI exits with an error
pub fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<TrainerError>() {
        Some(missing @ TrainerError::DataFileNotFound(_)) => format!("Error: {missing}"),
        _ => format!("An unexpected error occurred: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_query() {
        let input = Cursor::new("2024-03-15\n016031\nmas\n ajj \n22:15\n01:40\n1\n");
        let mut prompter = Prompter::new(input, Vec::new());
        let query = prompter.read_query().unwrap();

        assert_eq!(query.date, "2024-03-15");
        assert_eq!(query.train_number, "16031");
        assert_eq!(query.from_station, "MAS");
        assert_eq!(query.to_station, "AJJ");
        assert_eq!(query.scheduled_departure, "22:15");
        assert_eq!(query.scheduled_arrival, "01:40");
        assert_eq!(query.weather_condition, 1);

        let shown = String::from_utf8(prompter.into_output()).unwrap();
        assert!(shown.starts_with("Train Delay Prediction Model\n----------------------------\n"));
        assert!(shown.ends_with("Enter weather condition (0 for Clear, 1 for Bad): "));
    }

    #[test]
    fn test_non_integer_train_number() {
        let input = Cursor::new("2024-03-15\nexpress\n");
        let mut prompter = Prompter::new(input, Vec::new());
        assert!(matches!(prompter.read_query(), Err(TrainerError::Input(_))));
    }

    #[test]
    fn test_end_of_input() {
        let mut prompter = Prompter::new(Cursor::new("2024-03-15\n"), Vec::new());
        assert!(matches!(prompter.read_query(), Err(TrainerError::Input(_))));
    }

    #[test]
    fn test_render_prediction() {
        assert_eq!(
            render_prediction(Ok(12.346)).unwrap(),
            "\nPredicted Delay: 12.35 minutes"
        );
        assert_eq!(render_prediction(Ok(0.0)).unwrap(), "\nPredicted Delay: 0.00 minutes");

        let unknown = CoreError::UnknownCategory {
            column: "to_station".to_string(),
            value: "XYZ".to_string(),
        };
        assert_eq!(
            render_prediction(Err(unknown)).unwrap(),
            "\nError: 'XYZ' is an unknown category for to_station. It was not present in the training data."
        );

        let bad_time = CoreError::InvalidTime("25:99".to_string());
        assert!(matches!(
            render_prediction(Err(bad_time)),
            Err(TrainerError::Core(CoreError::InvalidTime(_)))
        ));
    }

    #[test]
    fn test_error_messages() {
        let missing = anyhow::Error::from(TrainerError::DataFileNotFound("data.csv".into()));
        assert_eq!(
            error_message(&missing),
            "Error: The data file 'data.csv' was not found."
        );

        let other = anyhow::Error::from(TrainerError::Dataset("dataset is empty".into()));
        assert_eq!(
            error_message(&other),
            "An unexpected error occurred: dataset error: dataset is empty"
        );

        let wrapped = anyhow::anyhow!("disk full").context("failed to save predictor to out");
        assert_eq!(
            error_message(&wrapped),
            "An unexpected error occurred: failed to save predictor to out: disk full"
        );
    }
}
