//! Core types for answerbook: utterance normalisation, the label catalog,
//! scored candidates, errors and configuration.

pub mod candidate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod normalize;

pub use candidate::ScoredCandidate;
pub use catalog::LabelCatalog;
pub use config::{DEFAULT_MAX_LENGTH, DEFAULT_TOP_K, ModelConfig};
pub use error::{ConfigError, ResolveError};
pub use normalize::normalize_utterance;
