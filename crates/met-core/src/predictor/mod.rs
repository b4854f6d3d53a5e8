//! MET activity prediction engine

mod classifier;
mod features;
mod gate;
mod inference;
mod labels;
mod output;
mod source;

pub use classifier::{InferenceStats, MetPredictor, PredictorConfig, SessionState};
pub use features::{FeatureValidator, DEFAULT_INPUT_WIDTH};
pub use gate::{ConfidenceGate, DEFAULT_CONFIDENCE_THRESHOLD};
pub use inference::{decode_tensor, TractEngine, TractSession};
pub use labels::{ClassLabelSet, CLASS_NAMES};
pub use output::{argmax, Decoding, ModelOutputs, OutputInterpreter, RawModelOutput};
pub use source::{
    compute_checksum, verify_checksum, DirectoryModelSource, ModelSource, StaticModelSource,
    DEFAULT_MODEL_ASSET,
};

use crate::error::Result;

/// Options passed to the engine when a session is created
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Fixed input width, if the model should be pinned to `[1, width]`
    pub input_width: Option<usize>,
}

/// A loaded model ready to run
pub trait InferenceSession: Send + Sync {
    /// Name of the single input the model expects
    fn input_name(&self) -> &str;

    /// Run one feature vector through the model
    fn run(&self, input_name: &str, features: &[f32]) -> Result<ModelOutputs>;

    /// Release engine resources
    ///
    /// Called exactly once, after the last `run` using this session has
    /// returned. Errors are logged by the caller.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Trait for inference engine implementations
pub trait InferenceEngine: Send + Sync {
    type Session: InferenceSession;

    /// Build a session from serialized model bytes
    fn create_session(&self, model_bytes: &[u8], options: &SessionOptions) -> Result<Self::Session>;
}
