//! Confidence gating
//!
//! An uncertain model is treated as "not exercising" rather than guessing an
//! activity level.

use crate::error::{PredictorError, Result};
use crate::models::{MetClass, PredictionResult};

/// Default minimum confidence for trusting a prediction
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Replaces low-confidence predictions with `Sedentary`
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    /// Create a gate, rejecting thresholds outside `[0, 1]`
    pub fn new(threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PredictorError::Config(format!(
                "confidence threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn gate(&self, result: &PredictionResult) -> MetClass {
        if self.passes(result) {
            result.met_class
        } else {
            MetClass::Sedentary
        }
    }

    /// True if `result` is confident enough to be trusted as is
    pub fn passes(&self, result: &PredictionResult) -> bool {
        result.confidence >= self.threshold
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let result = PredictionResult::new(MetClass::Moderate, 0.65);

        assert_eq!(ConfidenceGate::new(0.6).unwrap().gate(&result), MetClass::Moderate);
        assert_eq!(ConfidenceGate::new(0.7).unwrap().gate(&result), MetClass::Sedentary);
        assert_eq!(ConfidenceGate::new(0.65).unwrap().gate(&result), MetClass::Moderate);
    }

    #[test]
    fn test_default_threshold() {
        let gate = ConfidenceGate::default();
        assert_eq!(gate.threshold(), DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(
            gate.gate(&PredictionResult::new(MetClass::Vigorous, 0.59)),
            MetClass::Sedentary
        );
        assert_eq!(
            gate.gate(&PredictionResult::certain(MetClass::Vigorous)),
            MetClass::Vigorous
        );
    }

    #[test]
    fn test_fallback_never_passes_nonzero_threshold() {
        let gate = ConfidenceGate::default();
        assert!(!gate.passes(&PredictionResult::fallback()));
        assert_eq!(gate.gate(&PredictionResult::fallback()), MetClass::Sedentary);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(ConfidenceGate::new(-0.1).is_err());
        assert!(ConfidenceGate::new(1.5).is_err());
        assert!(ConfidenceGate::new(f32::NAN).is_err());
        assert!(ConfidenceGate::new(0.0).is_ok());
        assert!(ConfidenceGate::new(1.0).is_ok());
    }
}
