//! Error types for the MET predictor
//!
//! Only conditions that indicate an unusable engine or model surface as errors.
//! Bad features, a missing session and unrecognized outputs all degrade to the
//! sedentary fallback instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// The model asset could not be read from its source
    #[error("failed to read model asset `{name}`: {source}")]
    Asset {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Model bytes do not match the configured digest
    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The engine rejected the model
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine failed while running the model
    #[error("inference failed: {0}")]
    Inference(String),

    /// Initialization was requested after cleanup
    #[error("predictor has been closed")]
    Closed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PredictorError {
    /// True for failures raised by the inference engine itself
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::ModelLoad(_) | Self::Inference(_))
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;
