//! Single prediction command

use anyhow::Result;
use met_core::{MetClass, MetPredictor, TractEngine};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_class, color_confidence, print_json, print_table, print_warning, OutputFormat};

/// Result of one prediction, gated and ungated
#[derive(Debug, Serialize)]
pub struct PredictionReport {
    pub met_class: MetClass,
    pub predicted_class: MetClass,
    pub confidence: f32,
    pub threshold: f32,
    pub valid_input: bool,
}

/// Row for prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Activity")]
    met_class: String,
    #[tabled(rename = "Model Class")]
    predicted_class: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
}

/// Build the report for `features`
pub fn evaluate(predictor: &MetPredictor<TractEngine>, features: &[f32]) -> Result<PredictionReport> {
    let gate = predictor.confidence_gate();
    let result = predictor.predict_with_confidence(features)?;
    let valid_input = predictor.is_valid(features);

    Ok(PredictionReport {
        met_class: gate.gate(&result),
        predicted_class: result.met_class,
        confidence: result.confidence,
        threshold: gate.threshold(),
        valid_input,
    })
}

/// Run a single prediction and print it
pub fn run(predictor: &MetPredictor<TractEngine>, features: &[f32], format: OutputFormat) -> Result<()> {
    let report = evaluate(predictor, features)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if !report.valid_input {
                print_warning("Features rejected (empty, wrong width or non-finite); reporting the sedentary default");
            }
            print_table(&[PredictionRow {
                met_class: color_class(report.met_class),
                predicted_class: color_class(report.predicted_class),
                confidence: color_confidence(report.confidence, report.threshold),
                threshold: format!("{:.2}", report.threshold),
            }]);
        }
    }

    Ok(())
}
