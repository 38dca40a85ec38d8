//! Artifact locations and resolution settings.

use std::path::PathBuf;

use crate::ConfigError;

/// Default fixed token length for classifier input.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Default number of semantic neighbours consulted by the resolver.
pub const DEFAULT_TOP_K: usize = 5;

/// Where the pre-built artifacts live and how resolution is tuned.
///
/// Defaults point at the conventional layout of a deployment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Directory with the sequence classifier's `model.onnx` and `tokenizer.json`.
    pub classifier_dir: PathBuf,
    /// Directory with the sentence encoder's `model.onnx` and `tokenizer.json`.
    pub encoder_dir: PathBuf,
    /// JSON `label2id` object.
    pub catalog_path: PathBuf,
    /// Parquet file of label-keyed reference embeddings.
    pub embeddings_path: PathBuf,
    pub max_length: usize,
    pub top_k: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            classifier_dir: PathBuf::from("./saved_model"),
            encoder_dir: PathBuf::from("./sent_transf"),
            catalog_path: PathBuf::from("./label_mapping.json"),
            embeddings_path: PathBuf::from("./response_embeddings.parquet"),
            max_length: DEFAULT_MAX_LENGTH,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl ModelConfig {
    /// Reject settings that would make every resolution fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_length == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_length",
                reason: "must be at least 1".into(),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "top_k",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.max_length, 512);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.catalog_path, PathBuf::from("./label_mapping.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_top_k_rejected() {
        let config = ModelConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { name: "top_k", .. })
        ));
    }

    #[test]
    fn zero_max_length_rejected() {
        let config = ModelConfig {
            max_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting {
                name: "max_length",
                ..
            })
        ));
    }
}
