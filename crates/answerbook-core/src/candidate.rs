use serde::Serialize;

/// One semantic neighbour: a catalog label and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub label: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

impl ScoredCandidate {
    pub fn new(label: impl Into<String>, similarity: f32) -> Self {
        Self {
            label: label.into(),
            similarity,
        }
    }
}
