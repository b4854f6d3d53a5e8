//! Observability infrastructure for the MET predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, gating, engine errors, session state)
//! - Structured logging with tracing

use crate::models::PredictionResult;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

/// How a prediction call was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    /// The model answered with a recognized encoding
    Model,
    /// Features failed validation
    InvalidInput,
    /// No ready session
    NoSession,
    /// The model answered but no decoding rule matched
    UnrecognizedOutput,
}

impl PredictionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionOutcome::Model => "model",
            PredictionOutcome::InvalidInput => "invalid_input",
            PredictionOutcome::NoSession => "no_session",
            PredictionOutcome::UnrecognizedOutput => "unrecognized_output",
        }
    }
}

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    gated_to_sedentary: IntCounter,
    engine_errors: IntCounter,
    session_state: IntGaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "met_predictor_inference_latency_seconds",
                "Time spent running the activity classifier",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "met_predictor_predictions_total",
                "Prediction calls by outcome",
                &["outcome"]
            )
            .expect("Failed to register predictions_total"),

            gated_to_sedentary: register_int_counter!(
                "met_predictor_gated_to_sedentary_total",
                "Predictions replaced by Sedentary for falling below the confidence threshold"
            )
            .expect("Failed to register gated_to_sedentary"),

            engine_errors: register_int_counter!(
                "met_predictor_engine_errors_total",
                "Inference engine failures propagated to callers"
            )
            .expect("Failed to register engine_errors"),

            session_state: register_int_gauge_vec!(
                "met_predictor_session_state",
                "Inference session state by model asset (1 = ready, 2 = closed)",
                &["asset"]
            )
            .expect("Failed to register session_state"),
        }
    }
}

/// Predictor metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_outcome(&self, outcome: PredictionOutcome) {
        self.inner()
            .predictions_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn outcome_count(&self, outcome: PredictionOutcome) -> u64 {
        self.inner()
            .predictions_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn inc_gated(&self) {
        self.inner().gated_to_sedentary.inc();
    }

    pub fn inc_engine_errors(&self) {
        self.inner().engine_errors.inc();
    }

    pub fn set_session_state(&self, asset: &str, code: i64) {
        self.inner()
            .session_state
            .with_label_values(&[asset])
            .set(code);
    }

    pub fn session_state(&self, asset: &str) -> i64 {
        self.inner()
            .session_state
            .with_label_values(&[asset])
            .get()
    }
}

/// Structured logger for predictor events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Log an interpreted prediction
    pub fn log_prediction(&self, result: &PredictionResult, decoding: &str, elapsed_us: u128) {
        debug!(
            event = "prediction",
            component = %self.component,
            met_class = %result.met_class,
            confidence = result.confidence,
            decoding = %decoding,
            elapsed_us = elapsed_us,
            "Interpreted model output"
        );
    }

    /// Log a prediction answered with the sedentary default
    pub fn log_fallback(&self, outcome: PredictionOutcome) {
        debug!(
            event = "prediction_fallback",
            component = %self.component,
            outcome = %outcome.as_str(),
            "Returning sedentary default"
        );
    }

    pub fn log_session_ready(&self, asset: &str, input_name: &str, size_bytes: usize) {
        info!(
            event = "session_ready",
            component = %self.component,
            asset = %asset,
            input_name = %input_name,
            size_bytes = size_bytes,
            "Inference session initialized"
        );
    }

    pub fn log_session_closed(&self, teardown_error: Option<&str>) {
        match teardown_error {
            None => info!(
                event = "session_closed",
                component = %self.component,
                "Inference session closed"
            ),
            Some(error) => warn!(
                event = "session_closed",
                component = %self.component,
                error = %error,
                "Inference session teardown failed, session discarded"
            ),
        }
    }
}
