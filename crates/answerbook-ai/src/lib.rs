//! Ensemble resolution of utterances to canonical labels.
//!
//! A sequence classifier and a sentence-embedding index score the same
//! normalised text independently; [`ResolutionContext::resolve`] reconciles
//! them. ONNX Runtime backends for both models live behind the `onnx` feature.

mod classify;
mod index;
mod model;
mod resolver;

pub use classify::{ClassifierAdapter, select_class};
pub use index::SemanticIndex;
pub use model::{SentenceEncoder, SequenceClassifier};
pub use resolver::{Resolution, ResolutionContext, Verdict, arbitrate};

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::Embedder;

#[cfg(feature = "onnx")]
mod sequence;
#[cfg(feature = "onnx")]
pub use sequence::OnnxClassifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
