//! Model inspection command

use anyhow::{Context, Result};
use colored::Colorize;
use met_core::predictor::{compute_checksum, DirectoryModelSource, ModelSource};
use met_core::{MetPredictor, TractEngine};
use serde::Serialize;

use crate::output::{print_json, OutputFormat};

/// Facts about the loaded model
#[derive(Debug, Serialize)]
struct ModelReport {
    path: String,
    size_bytes: usize,
    sha256: String,
    input_name: Option<String>,
    input_width: Option<usize>,
    confidence_threshold: f32,
}

/// Load the model and print what the predictor sees
pub fn run(
    predictor: &MetPredictor<TractEngine>,
    source: &DirectoryModelSource,
    format: OutputFormat,
) -> Result<()> {
    let asset = &predictor.config().model_asset;
    let bytes = source
        .load(asset)
        .with_context(|| format!("Failed to read model {}", asset))?;

    let report = ModelReport {
        path: source.path_for(asset).display().to_string(),
        size_bytes: bytes.len(),
        sha256: compute_checksum(&bytes),
        input_name: predictor.input_name(),
        input_width: predictor.config().input_width,
        confidence_threshold: predictor.confidence_gate().threshold(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Model".bold());
            println!("{}", "=".repeat(60));
            println!("Path:       {}", report.path.cyan());
            println!("Size:       {} bytes", report.size_bytes);
            println!("SHA256:     {}", report.sha256);
            println!(
                "Input:      {}",
                report.input_name.as_deref().unwrap_or("<not loaded>").cyan()
            );
            match report.input_width {
                Some(width) => println!("Width:      {}", width),
                None => println!("Width:      declared by model"),
            }
            println!("Threshold:  {:.2}", report.confidence_threshold);
        }
    }

    Ok(())
}
