//! Semantic index: nearest reference responses by cosine similarity.
//!
//! Reference rows are keyed by label and validated against the catalog when
//! the index is built, then stored in catalog order. Ranking ties are broken
//! by ascending catalog position so identical queries rank identically.

use std::collections::HashMap;
use std::sync::Arc;

use answerbook_core::{ConfigError, LabelCatalog, ResolveError, ScoredCandidate};
use answerbook_store::ReferenceEmbeddings;
use tracing::debug;

use crate::SentenceEncoder;

pub struct SemanticIndex {
    encoder: Box<dyn SentenceEncoder>,
    catalog: Arc<LabelCatalog>,
    /// Row `i` embeds the label at catalog position `i`.
    rows: Vec<Vec<f32>>,
    norms: Vec<f32>,
    dim: usize,
}

impl SemanticIndex {
    /// Build the index from label-keyed reference embeddings.
    ///
    /// Every catalog label needs exactly one row, every row must name a
    /// catalog label, and all rows must share the encoder's dimension.
    pub fn new(
        encoder: Box<dyn SentenceEncoder>,
        catalog: Arc<LabelCatalog>,
        references: ReferenceEmbeddings,
    ) -> Result<Self, ConfigError> {
        if catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let dim = encoder.dim();
        if dim == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "encoder dimension",
                reason: "must be at least 1".into(),
            });
        }

        let mut by_label: HashMap<String, Vec<f32>> = HashMap::with_capacity(catalog.len());
        for (label, vector) in references.into_rows() {
            if !catalog.contains(&label) {
                return Err(ConfigError::UnknownEmbeddingLabel(label));
            }
            if vector.len() != dim {
                return Err(ConfigError::DimensionMismatch {
                    context: format!("reference embedding for {label:?}"),
                    expected: dim,
                    actual: vector.len(),
                });
            }
            if by_label.contains_key(&label) {
                return Err(ConfigError::DuplicateEmbedding(label));
            }
            by_label.insert(label, vector);
        }

        let mut rows = Vec::with_capacity(catalog.len());
        for label in catalog.labels() {
            let row = by_label
                .remove(label)
                .ok_or_else(|| ConfigError::MissingEmbedding(label.to_string()))?;
            rows.push(row);
        }

        let norms = rows.iter().map(|r| l2_norm(r)).collect();

        Ok(Self {
            encoder,
            catalog,
            rows,
            norms,
            dim,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn catalog(&self) -> &Arc<LabelCatalog> {
        &self.catalog
    }

    /// Encode `text` and return its `min(k, N)` nearest labels, best first.
    pub fn search(&self, text: &str, k: usize) -> Result<Vec<ScoredCandidate>, ResolveError> {
        let query = self.encoder.encode(text)?;
        self.search_vector(&query, k)
    }

    /// Rank catalog labels against a precomputed query vector.
    pub fn search_vector(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredCandidate>, ResolveError> {
        if query.len() != self.dim {
            return Err(ConfigError::DimensionMismatch {
                context: "query vector".into(),
                expected: self.dim,
                actual: query.len(),
            }
            .into());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(self.rows.len());
        for (i, (row, &row_norm)) in self.rows.iter().zip(&self.norms).enumerate() {
            let sim = cosine_sim(query, query_norm, row, row_norm);
            if !sim.is_finite() {
                return Err(ResolveError::inference(format!(
                    "non-finite similarity for catalog position {i}"
                )));
            }
            scored.push((i, sim));
        }

        // Descending similarity, then ascending catalog position.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        let candidates: Vec<ScoredCandidate> = scored
            .into_iter()
            .filter_map(|(i, sim)| {
                self.catalog
                    .label_for_id(i)
                    .map(|label| ScoredCandidate::new(label, sim))
            })
            .collect();

        debug!(
            k,
            returned = candidates.len(),
            top = candidates.first().map(|c| c.label.as_str()),
            "semantic search"
        );
        Ok(candidates)
    }
}

/// Cosine similarity given precomputed norms; zero vectors score 0.0.
fn cosine_sim(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (a_norm * b_norm)).clamp(-1.0, 1.0)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
