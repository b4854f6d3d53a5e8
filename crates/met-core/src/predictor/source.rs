//! Model asset sources
//!
//! A source hands the predictor raw model bytes by asset name. The bytes are
//! opaque here; only the inference engine interprets them.

use crate::error::{PredictorError, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;

/// Asset name of the bundled classifier
pub const DEFAULT_MODEL_ASSET: &str = "rf.onnx";

/// Where model bytes come from
pub trait ModelSource: Send + Sync {
    /// Read the asset called `name`
    fn load(&self, name: &str) -> Result<Vec<u8>>;
}

/// Loads assets from files under a directory
#[derive(Debug, Clone)]
pub struct DirectoryModelSource {
    root: PathBuf,
}

impl DirectoryModelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ModelSource for DirectoryModelSource {
    fn load(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        let bytes = std::fs::read(&path).map_err(|source| PredictorError::Asset {
            name: name.to_string(),
            source,
        })?;
        debug!(path = %path.display(), size_bytes = bytes.len(), "Loaded model asset");
        Ok(bytes)
    }
}

/// Serves a single asset held in memory
#[derive(Debug, Clone)]
pub struct StaticModelSource {
    name: String,
    bytes: Vec<u8>,
}

impl StaticModelSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl ModelSource for StaticModelSource {
    fn load(&self, name: &str) -> Result<Vec<u8>> {
        if name != self.name {
            return Err(PredictorError::Asset {
                name: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
            });
        }
        Ok(self.bytes.clone())
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check `data` against an expected hex digest (case-insensitive)
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let actual = compute_checksum(data);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(PredictorError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_source_reads_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_MODEL_ASSET), b"model-bytes").unwrap();

        let source = DirectoryModelSource::new(dir.path());
        assert_eq!(source.load(DEFAULT_MODEL_ASSET).unwrap(), b"model-bytes");
    }

    #[test]
    fn test_directory_source_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryModelSource::new(dir.path());

        match source.load("missing.onnx") {
            Err(PredictorError::Asset { name, source }) => {
                assert_eq!(name, "missing.onnx");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected asset error, got {:?}", other),
        }
    }

    #[test]
    fn test_static_source_only_serves_its_name() {
        let source = StaticModelSource::new("rf.onnx", vec![1, 2, 3]);
        assert_eq!(source.load("rf.onnx").unwrap(), vec![1, 2, 3]);
        assert!(source.load("other.onnx").is_err());
    }

    #[test]
    fn test_checksum_verification() {
        let digest = compute_checksum(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(verify_checksum(b"abc", &digest.to_uppercase()).is_ok());
        assert!(matches!(
            verify_checksum(b"abd", &digest),
            Err(PredictorError::ChecksumMismatch { .. })
        ));
    }
}
