//! MET activity classifier CLI
//!
//! Runs the activity classifier against a local ONNX model, inspects the
//! model and replays recorded feature windows into activity summaries.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{inspect, predict, replay};
use met_core::predictor::DirectoryModelSource;
use met_core::{MetPredictor, TractEngine};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// MET activity classifier CLI
#[derive(Parser)]
#[command(name = "metc")]
#[command(author, version, about = "CLI for the MET activity classifier", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/met/config.toml)
    #[arg(long, env = "METC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the model asset
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Model asset file name
    #[arg(long)]
    pub model: Option<String>,

    /// Minimum confidence before a prediction is trusted
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a single feature vector
    Predict {
        /// Comma-separated feature values
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        features: Vec<f32>,
    },

    /// Show the model's input and checksum
    Inspect,

    /// Replay a JSON-lines file of feature windows into activity summaries
    Replay {
        /// File with one {"timestamp_ms", "features"} object per line
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    // Load configuration, then apply flag overrides
    let mut config = config::MetConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.model_dir {
        config.model_dir = dir;
    }
    if let Some(model) = cli.model {
        config.model_asset = model;
    }
    if let Some(threshold) = cli.threshold {
        config.confidence_threshold = threshold;
    }
    debug!(?config, "Configuration loaded");

    let source = DirectoryModelSource::new(&config.model_dir);
    let predictor = MetPredictor::new(TractEngine, config.predictor_config())
        .context("Invalid predictor configuration")?;
    predictor
        .init(&source)
        .with_context(|| format!("Failed to initialize model from {}", config.model_dir.display()))?;
    info!(model = %config.model_asset, "Predictor ready");

    let outcome = match cli.command {
        Commands::Predict { features } => predict::run(&predictor, &features, cli.format),
        Commands::Inspect => inspect::run(&predictor, &source, cli.format),
        Commands::Replay { file } => replay::run(&predictor, &file, cli.format),
    };

    predictor.cleanup();
    outcome
}
