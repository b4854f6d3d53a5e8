//! ONNX inference using tract
//!
//! Loads the activity classifier with tract-onnx and decodes its output
//! tensors into [`RawModelOutput`] slots.

use super::output::{ModelOutputs, RawModelOutput};
use super::{InferenceEngine, InferenceSession, SessionOptions};
use crate::error::{PredictorError, Result};
use tract_onnx::prelude::*;
use tracing::{debug, trace};

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Engine backed by tract-onnx
#[derive(Debug, Clone, Copy, Default)]
pub struct TractEngine;

impl InferenceEngine for TractEngine {
    type Session = TractSession;

    fn create_session(&self, model_bytes: &[u8], options: &SessionOptions) -> Result<TractSession> {
        TractSession::load(model_bytes, options.input_width)
    }
}

/// A loaded, optimized tract plan
pub struct TractSession {
    plan: TractModel,
    input_name: String,
}

impl TractSession {
    /// Parse and optimize an ONNX model, fixing the input to `[1, width]` when known
    fn load(model_bytes: &[u8], input_width: Option<usize>) -> Result<Self> {
        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| PredictorError::ModelLoad(format!("Failed to parse ONNX model: {:#}", e)))?;

        let input_name = {
            let outlets = model
                .input_outlets()
                .map_err(|e| PredictorError::ModelLoad(format!("{:#}", e)))?;
            let first = outlets
                .first()
                .ok_or_else(|| PredictorError::ModelLoad("Model declares no inputs".to_string()))?;
            model.node(first.node).name.clone()
        };

        if let Some(width) = input_width {
            model = model
                .with_input_fact(0, f32::fact([1, width]).into())
                .map_err(|e| PredictorError::ModelLoad(format!("Failed to set input shape: {:#}", e)))?;
        }

        let plan = model
            .into_optimized()
            .map_err(|e| PredictorError::ModelLoad(format!("Failed to optimize model: {:#}", e)))?
            .into_runnable()
            .map_err(|e| {
                PredictorError::ModelLoad(format!("Failed to create runnable model: {:#}", e))
            })?;

        debug!(input = %input_name, ?input_width, "ONNX model loaded");
        Ok(Self { plan, input_name })
    }
}

impl InferenceSession for TractSession {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn run(&self, input_name: &str, features: &[f32]) -> Result<ModelOutputs> {
        // tract binds inputs by position; the name is only used for tracing
        trace!(input = %input_name, width = features.len(), "Running tract plan");

        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| PredictorError::Inference(format!("Failed to shape input tensor: {}", e)))?
            .into();

        let result = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| PredictorError::Inference(format!("{:#}", e)))?;

        Ok(result.iter().map(|value| decode_tensor(value)).collect::<Vec<_>>().into())
    }
}

/// Decode one output tensor into a slot
///
/// Integer tensors are hard labels (first element); floating tensors are
/// probability rows (first row of a `1 x K` batch). Anything else is kept as
/// an unsupported slot so the interpreter can skip it.
pub fn decode_tensor(tensor: &Tensor) -> RawModelOutput {
    let decoded = match tensor.datum_type() {
        DatumType::I64 => tensor
            .as_slice::<i64>()
            .ok()
            .and_then(|s| s.first().copied())
            .map(RawModelOutput::Label),
        DatumType::I32 => tensor
            .as_slice::<i32>()
            .ok()
            .and_then(|s| s.first().copied())
            .map(|v| RawModelOutput::Label(i64::from(v))),
        DatumType::F32 => tensor
            .as_slice::<f32>()
            .ok()
            .map(|s| RawModelOutput::Probabilities(first_row(s, tensor.shape()).to_vec())),
        DatumType::F64 => tensor.as_slice::<f64>().ok().map(|s| {
            RawModelOutput::Probabilities(
                first_row(s, tensor.shape()).iter().map(|&v| v as f32).collect(),
            )
        }),
        _ => None,
    };

    decoded.unwrap_or_else(|| {
        RawModelOutput::Unsupported(format!(
            "{:?} tensor of shape {:?}",
            tensor.datum_type(),
            tensor.shape()
        ))
    })
}

fn first_row<'a, T>(values: &'a [T], shape: &[usize]) -> &'a [T] {
    match shape {
        [_, .., cols] => &values[..(*cols).min(values.len())],
        _ => values,
    }
}
