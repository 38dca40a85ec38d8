//! Inference seams: the two pretrained models the resolver consults.
//!
//! Implementations must be safe to call from several threads at once; a
//! backend whose runtime needs exclusive access serialises internally.

use answerbook_core::ResolveError;

/// A sequence-classification model producing one logit per catalog class.
pub trait SequenceClassifier: Send + Sync {
    /// Number of output classes, when the model declares it statically.
    fn num_classes(&self) -> Option<usize>;

    /// Fixed token length the model's input is padded or truncated to.
    fn max_length(&self) -> Option<usize> {
        None
    }

    /// Logits for a single (already normalised) text.
    fn logits(&self, text: &str) -> Result<Vec<f32>, ResolveError>;
}

/// A sentence-embedding model mapping text to a fixed-length vector.
pub trait SentenceEncoder: Send + Sync {
    fn dim(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>, ResolveError>;
}
