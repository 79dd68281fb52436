//! Train delay predictor CLI
//!
//! Trains (or loads) a delay model, then asks for one trip on the console
//! and prints its predicted arrival delay.

use anyhow::{Context, Result};
use clap::Parser;
use delay_core::{predict_delay, DelayPredictor};
use delay_trainer::prompt::{error_message, render_prediction, Prompter};
use delay_trainer::{build_predictor, Objective, TrainingParams};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "delay-predictor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a delay model and predict the arrival delay of one trip", long_about = None)]
struct Args {
    /// Trip history CSV used for training
    #[arg(short, long, default_value = "data.csv")]
    data: PathBuf,

    /// TOML file with training parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load a saved predictor instead of training
    #[arg(short, long, conflicts_with = "config")]
    model: Option<PathBuf>,

    /// Directory to write predictor.json and predictor.hash into
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Training objective (l1 or l2)
    #[arg(long)]
    objective: Option<Objective>,

    /// Maximum boosting rounds
    #[arg(long)]
    num_rounds: Option<usize>,

    /// Shrinkage per tree
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Seed for splitting, bagging and feature sampling
    #[arg(long)]
    seed: Option<i64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn training_params(&self) -> Result<TrainingParams> {
        let mut params = match &self.config {
            Some(path) => TrainingParams::from_toml_file(path)?,
            None => TrainingParams::default(),
        };

        if let Some(objective) = self.objective {
            params.objective = objective;
        }
        if let Some(num_rounds) = self.num_rounds {
            params.num_rounds = num_rounds;
        }
        if let Some(learning_rate) = self.learning_rate {
            params.learning_rate = learning_rate;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }

        params.validate()?;
        Ok(params)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {err}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{}", error_message(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    info!("Train delay predictor v{}", env!("CARGO_PKG_VERSION"));

    let predictor = match &args.model {
        Some(path) => {
            info!("Loading predictor from: {}", path.display());
            DelayPredictor::load(path)
                .with_context(|| format!("failed to load predictor {}", path.display()))?
        }
        None => {
            let params = args.training_params()?;
            let (predictor, outcome) = build_predictor(&args.data, &params)?;
            info!(
                "Kept {} of {} rounds",
                outcome.best_round, outcome.rounds_run
            );
            predictor
        }
    };

    if let Some(dir) = &args.save_model {
        let hash = predictor
            .save(dir)
            .with_context(|| format!("failed to save predictor to {}", dir.display()))?;
        info!("Predictor hash: {}", hash);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());
    let query = prompter.read_query()?;
    let mut out = prompter.into_output();

    let message = render_prediction(predict_delay(&predictor, &query))?;
    writeln!(out, "{message}")?;

    Ok(())
}
