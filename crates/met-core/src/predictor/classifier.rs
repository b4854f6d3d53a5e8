//! Prediction orchestration
//!
//! Validates features, runs the model when a session is ready, interprets the
//! outputs and gates them by confidence. Data-shape problems and a missing
//! session degrade to `Sedentary`; only engine failures reach the caller.

use super::features::FeatureValidator;
use super::gate::{ConfidenceGate, DEFAULT_CONFIDENCE_THRESHOLD};
use super::output::{Decoding, OutputInterpreter};
use super::source::{verify_checksum, ModelSource, DEFAULT_MODEL_ASSET};
use super::{InferenceEngine, InferenceSession, SessionOptions};
use crate::error::{PredictorError, Result};
use crate::models::{MetClass, PredictionResult};
use crate::observability::{PredictionOutcome, PredictorMetrics, StructuredLogger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

/// Configuration for the predictor
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Asset name passed to the model source
    pub model_asset: String,
    /// Minimum confidence for `predict` to trust the model
    pub confidence_threshold: f32,
    /// Required feature count; also pins the model input shape. Unset
    /// accepts any non-empty finite vector and leaves the shape to the model
    pub input_width: Option<usize>,
    /// Hex SHA256 digest the model bytes must match
    pub expected_sha256: Option<String>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_asset: DEFAULT_MODEL_ASSET.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            input_width: None,
            expected_sha256: None,
        }
    }
}

/// Lifecycle of the inference session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

impl SessionState {
    fn code(self) -> i64 {
        match self {
            SessionState::Uninitialized => 0,
            SessionState::Ready => 1,
            SessionState::Closed => 2,
        }
    }
}

/// A live session; released when the last handle drops, so a `cleanup`
/// racing an in-flight `run` defers `close` until that run returns
struct ReadySession<S: InferenceSession> {
    session: S,
    input_name: String,
    logger: StructuredLogger,
}

impl<S: InferenceSession> Drop for ReadySession<S> {
    fn drop(&mut self) {
        let error = self.session.close().err().map(|e| e.to_string());
        self.logger.log_session_closed(error.as_deref());
    }
}

enum Slot<S: InferenceSession> {
    Uninitialized,
    Ready(Arc<ReadySession<S>>),
    Closed,
}

impl<S: InferenceSession> Slot<S> {
    fn state(&self) -> SessionState {
        match self {
            Slot::Uninitialized => SessionState::Uninitialized,
            Slot::Ready(_) => SessionState::Ready,
            Slot::Closed => SessionState::Closed,
        }
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Activity classifier over an external inference engine
pub struct MetPredictor<E: InferenceEngine> {
    engine: E,
    config: PredictorConfig,
    validator: FeatureValidator,
    interpreter: OutputInterpreter,
    gate: ConfidenceGate,
    slot: RwLock<Slot<E::Session>>,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl<E: InferenceEngine> MetPredictor<E> {
    /// Create an uninitialized predictor
    pub fn new(engine: E, config: PredictorConfig) -> Result<Self> {
        let gate = ConfidenceGate::new(config.confidence_threshold)?;
        let validator = match config.input_width {
            Some(0) => {
                return Err(PredictorError::Config(
                    "input width must be greater than zero".to_string(),
                ))
            }
            Some(width) => FeatureValidator::with_width(width),
            None => FeatureValidator::new(),
        };

        Ok(Self {
            engine,
            config,
            validator,
            interpreter: OutputInterpreter::new(),
            gate,
            slot: RwLock::new(Slot::Uninitialized),
            metrics: PredictorMetrics::new(),
            logger: StructuredLogger::new("met_predictor"),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// The gate `predict` applies
    pub fn confidence_gate(&self) -> ConfidenceGate {
        self.gate
    }

    pub fn state(&self) -> SessionState {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).state()
    }

    /// Whether `features` pass the validation `predict` applies
    pub fn is_valid(&self, features: &[f32]) -> bool {
        self.validator.is_valid(features)
    }

    /// Name of the model input, once a session is ready
    pub fn input_name(&self) -> Option<String> {
        self.ready_session().map(|ready| ready.input_name.clone())
    }

    /// Load the model and create the session
    ///
    /// The write lock is held across session creation, so concurrent first
    /// calls create exactly one session. Calling again once ready is a no-op;
    /// calling after `cleanup` fails with [`PredictorError::Closed`].
    pub fn init(&self, source: &dyn ModelSource) -> Result<()> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Slot::Ready(_) => {
                debug!("Inference session already initialized");
                return Ok(());
            }
            Slot::Closed => return Err(PredictorError::Closed),
            Slot::Uninitialized => {}
        }

        let bytes = source.load(&self.config.model_asset)?;
        if let Some(expected) = &self.config.expected_sha256 {
            verify_checksum(&bytes, expected)?;
        }

        let options = SessionOptions {
            input_width: self.config.input_width,
        };
        let session = self.engine.create_session(&bytes, &options)?;
        let input_name = session.input_name().to_string();

        self.logger
            .log_session_ready(&self.config.model_asset, &input_name, bytes.len());
        *slot = Slot::Ready(Arc::new(ReadySession {
            session,
            input_name,
            logger: self.logger.clone(),
        }));
        self.metrics
            .set_session_state(&self.config.model_asset, SessionState::Ready.code());
        Ok(())
    }

    /// Predict the activity class, replacing low-confidence answers with `Sedentary`
    pub fn predict(&self, features: &[f32]) -> Result<MetClass> {
        let result = self.predict_with_confidence(features)?;
        let met_class = self.gate.gate(&result);
        if met_class != result.met_class {
            self.metrics.inc_gated();
            debug!(
                predicted = %result.met_class,
                confidence = result.confidence,
                threshold = self.gate.threshold(),
                "Prediction below confidence threshold"
            );
        }
        Ok(met_class)
    }

    /// Predict the activity class and the model's raw confidence, ungated
    pub fn predict_with_confidence(&self, features: &[f32]) -> Result<PredictionResult> {
        if !self.validator.is_valid(features) {
            return Ok(self.fallback(PredictionOutcome::InvalidInput));
        }

        let Some(ready) = self.ready_session() else {
            return Ok(self.fallback(PredictionOutcome::NoSession));
        };

        let start = Instant::now();
        let outputs = ready
            .session
            .run(&ready.input_name, features)
            .inspect_err(|e| {
                self.metrics.inc_engine_errors();
                warn!(error = %e, "Inference engine failure");
            })?;
        let (result, decoding) = self.interpreter.extract_with_decoding(&outputs);
        drop(outputs);

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        }

        let outcome = match decoding {
            Decoding::Unrecognized => PredictionOutcome::UnrecognizedOutput,
            _ => PredictionOutcome::Model,
        };
        self.metrics.inc_outcome(outcome);
        self.logger
            .log_prediction(&result, decoding_name(decoding), elapsed.as_micros());

        Ok(result)
    }

    /// Release the session and move to `Closed`
    ///
    /// Idempotent and safe before `init`. The engine session is closed once
    /// the last in-flight prediction holding it finishes; teardown failures
    /// are logged and the session is discarded regardless.
    pub fn cleanup(&self) {
        let previous = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, Slot::Closed)
        };

        match previous {
            Slot::Ready(ready) => {
                if Arc::strong_count(&ready) > 1 {
                    debug!("Session in use, release deferred to the last in-flight prediction");
                }
                drop(ready);
            }
            Slot::Uninitialized => {
                debug!("Cleanup requested with no live session");
            }
            Slot::Closed => return,
        }
        self.metrics
            .set_session_state(&self.config.model_asset, SessionState::Closed.code());
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }

    fn ready_session(&self) -> Option<Arc<ReadySession<E::Session>>> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Ready(ready) => Some(Arc::clone(ready)),
            Slot::Uninitialized | Slot::Closed => None,
        }
    }

    fn fallback(&self, outcome: PredictionOutcome) -> PredictionResult {
        self.metrics.inc_outcome(outcome);
        self.logger.log_fallback(outcome);
        PredictionResult::fallback()
    }
}

fn decoding_name(decoding: Decoding) -> &'static str {
    match decoding {
        Decoding::Label => "label",
        Decoding::Probabilities { slot: 0 } => "probabilities_slot0",
        Decoding::Probabilities { .. } => "probabilities_slot1",
        Decoding::ProbabilityMap => "probability_map",
        Decoding::Unrecognized => "unrecognized",
    }
}
