use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::error;

use basic_cleaning::{clean, logging, CleaningConfig, CleaningReport, LocalArtifactStore};

/// A very basic data cleaning
#[derive(Parser)]
#[command(name = "basic-cleaning", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the input artifact, clean it, and log the output artifact
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Name for the input artifact
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name for the output artifact
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type for the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Description for the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum price threshold for the outliers
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: i64,

    /// Maximum price threshold for the outliers
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: i64,
}

impl From<RunArgs> for CleaningConfig {
    fn from(args: RunArgs) -> Self {
        CleaningConfig {
            input_artifact: args.input_artifact,
            output_artifact: args.output_artifact,
            output_type: args.output_type,
            output_description: args.output_description,
            min_price: args.min_price as f64,
            max_price: args.max_price as f64,
        }
    }
}

fn run(args: RunArgs) -> Result<CleaningReport> {
    let config = CleaningConfig::from(args);
    let work_dir = std::env::current_dir().context("resolving working directory")?;
    let mut store = LocalArtifactStore::from_env();
    clean(&mut store, &config, &work_dir)
        .with_context(|| format!("cleaning {}", config.input_artifact))
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => run(args),
    };

    match result {
        Ok(report) => {
            println!("{}", report.output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
