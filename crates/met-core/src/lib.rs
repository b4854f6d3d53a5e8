//! MET activity classification library
//!
//! This crate provides the core functionality for:
//! - Validating accelerometer feature vectors
//! - Running the activity classifier through an inference engine
//! - Interpreting heterogeneous model outputs into a class and confidence
//! - Confidence gating with a sedentary fallback
//! - Activity session tracking
//! - Activity history with daily and weekly summaries

pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod tracker;

pub use error::{PredictorError, Result};
pub use history::{ActivityLog, MergeOutcome};
pub use models::*;
pub use observability::{PredictionOutcome, PredictorMetrics, StructuredLogger};
pub use predictor::{MetPredictor, PredictorConfig, SessionState, TractEngine};
pub use tracker::{ActivityTracker, TrackerConfig};
