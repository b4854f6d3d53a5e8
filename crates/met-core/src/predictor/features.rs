//! Feature validation for ML inference
//!
//! Feature vectors are computed upstream from accelerometer windows. This
//! module only checks that a vector is fit to hand to the model.

/// Number of features produced by the accelerometer window
/// (mean, variance and standard deviation per axis)
pub const DEFAULT_INPUT_WIDTH: usize = 9;

/// Checks feature vectors before they are sent to inference
#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    expected_width: Option<usize>,
}

impl FeatureValidator {
    /// Validator that accepts any non-empty, finite vector
    pub fn new() -> Self {
        Self {
            expected_width: None,
        }
    }

    /// Validator that additionally requires exactly `width` elements
    pub fn with_width(width: usize) -> Self {
        Self {
            expected_width: Some(width),
        }
    }

    pub fn expected_width(&self) -> Option<usize> {
        self.expected_width
    }

    /// Returns false for an absent or empty vector, or one holding NaN/infinity
    pub fn validate(&self, features: Option<&[f32]>) -> bool {
        match features {
            Some(f) => self.is_valid(f),
            None => false,
        }
    }

    pub fn is_valid(&self, features: &[f32]) -> bool {
        if features.is_empty() {
            return false;
        }
        if let Some(width) = self.expected_width {
            if features.len() != width {
                return false;
            }
        }
        features.iter().all(|v| v.is_finite())
    }
}
