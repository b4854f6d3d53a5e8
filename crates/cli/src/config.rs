//! Configuration management for the CLI

use anyhow::{Context, Result};
use met_core::predictor::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_WIDTH, DEFAULT_MODEL_ASSET};
use met_core::PredictorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration
///
/// Read from `~/.config/met/config.toml` (or `--config`), then overridden by
/// `MET_*` environment variables and finally by command-line flags.
#[derive(Debug, Clone, Deserialize)]
pub struct MetConfig {
    /// Directory holding the model asset
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Model asset file name
    #[serde(default = "default_model_asset")]
    pub model_asset: String,

    /// Minimum confidence before a prediction is trusted
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Expected feature count; 0 uses the shape declared by the model
    #[serde(default = "default_input_width")]
    pub input_width: usize,

    /// Expected SHA256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_model_asset() -> String {
    DEFAULT_MODEL_ASSET.to_string()
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_input_width() -> usize {
    DEFAULT_INPUT_WIDTH
}

impl Default for MetConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            model_asset: default_model_asset(),
            confidence_threshold: default_confidence_threshold(),
            input_width: default_input_width(),
            model_sha256: None,
        }
    }
}

impl MetConfig {
    /// Load configuration from a config file and the environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix("MET"))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the default configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("met").join("config.toml"))
    }

    /// Predictor settings derived from this configuration
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            model_asset: self.model_asset.clone(),
            confidence_threshold: self.confidence_threshold,
            input_width: (self.input_width > 0).then_some(self.input_width),
            expected_sha256: self.model_sha256.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MetConfig::default();
        assert_eq!(config.model_asset, "rf.onnx");
        assert_eq!(config.confidence_threshold, 0.6);

        let predictor = config.predictor_config();
        assert_eq!(predictor.input_width, Some(9));
        assert!(predictor.expected_sha256.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "model_dir = \"/opt/models\"").unwrap();
        writeln!(file, "confidence_threshold = 0.75").unwrap();
        writeln!(file, "input_width = 0").unwrap();

        let config = MetConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.model_asset, "rf.onnx");
        assert_eq!(config.predictor_config().input_width, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MetConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
