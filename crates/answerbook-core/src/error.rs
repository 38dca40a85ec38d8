use thiserror::Error;

/// Artifact or configuration mismatch. Fatal: retrying cannot help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("label catalog is empty")]
    EmptyCatalog,

    #[error("label catalog contains an empty label")]
    EmptyLabel,

    #[error("label {0:?} is listed more than once")]
    DuplicateLabel(String),

    #[error("label {label:?} has negative class id {id}")]
    NegativeClassId { label: String, id: i64 },

    #[error("class id {id} is assigned to both {first:?} and {second:?}")]
    DuplicateClassId { id: i64, first: String, second: String },

    #[error("class ids must be contiguous from 0: {size} labels but highest id is {max_id}")]
    NonContiguousClassIds { size: usize, max_id: i64 },

    #[error("predicted class id {id} is not in the catalog ({catalog_size} labels)")]
    UnknownClassId { id: usize, catalog_size: usize },

    #[error("classifier produces {classes} classes but the catalog has {catalog_size} labels")]
    ClassCountMismatch { classes: usize, catalog_size: usize },

    #[error("{context}: expected dimension {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("no reference embedding for label {0:?}")]
    MissingEmbedding(String),

    #[error("more than one reference embedding for label {0:?}")]
    DuplicateEmbedding(String),

    #[error("reference embedding for {0:?}, which is not in the catalog")]
    UnknownEmbeddingLabel(String),

    #[error("{component} was built on a different label catalog")]
    CatalogMismatch { component: &'static str },

    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Failure of a single resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ResolveError {
    /// Build an inference error from any displayable cause.
    pub fn inference(cause: impl std::fmt::Display) -> Self {
        Self::Inference(cause.to_string())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Short machine-readable category, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Inference(_) => "inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_distinguishable() {
        let err: ResolveError = ConfigError::EmptyCatalog.into();
        assert!(err.is_config());
        assert_eq!(err.kind(), "config");
        assert_eq!(err.to_string(), "configuration error: label catalog is empty");
    }

    #[test]
    fn inference_errors_carry_cause() {
        let err = ResolveError::inference("bad tensor shape [1, 3]");
        assert!(!err.is_config());
        assert_eq!(err.kind(), "inference");
        assert_eq!(err.to_string(), "inference failed: bad tensor shape [1, 3]");
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = ConfigError::DimensionMismatch {
            context: "query vector".into(),
            expected: 384,
            actual: 768,
        };
        assert_eq!(err.to_string(), "query vector: expected dimension 384, got 768");
    }
}
