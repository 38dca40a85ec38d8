//! Ensemble resolution: classifier decision checked against semantic neighbours.
//!
//! The classifier gives one crisp answer; the semantic index says which
//! reference responses the utterance is actually close to. When the
//! classifier's label is among the `top_k` neighbours it stands, otherwise
//! the nearest neighbour wins.

use std::sync::Arc;

use answerbook_core::{
    ConfigError, LabelCatalog, ModelConfig, ResolveError, ScoredCandidate, normalize_utterance,
};
use tracing::debug;

use crate::{ClassifierAdapter, SemanticIndex};

/// How the final label was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The classifier label appears among the semantic candidates.
    Corroborated,
    /// The classifier label was not among the candidates; the top candidate won.
    Fallback,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Corroborated => "corroborated",
            Self::Fallback => "fallback",
        }
    }
}

/// Outcome of resolving one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub label: String,
    pub normalized: String,
    pub classifier_label: String,
    /// Semantic neighbours, best first.
    pub candidates: Vec<ScoredCandidate>,
    pub verdict: Verdict,
}

/// Apply the arbitration rule to both scorers' outputs.
///
/// Returns the classifier label and [`Verdict::Corroborated`] if it is among
/// `candidates`, else the first candidate's label and [`Verdict::Fallback`].
/// No candidates at all means the catalog is empty.
pub fn arbitrate(
    classifier_label: &str,
    candidates: &[ScoredCandidate],
) -> Result<(String, Verdict), ConfigError> {
    let top = candidates.first().ok_or(ConfigError::EmptyCatalog)?;

    if candidates.iter().any(|c| c.label == classifier_label) {
        Ok((classifier_label.to_string(), Verdict::Corroborated))
    } else {
        Ok((top.label.clone(), Verdict::Fallback))
    }
}

/// Everything a resolution reads, loaded once and never mutated.
///
/// Share it behind an [`Arc`]; [`resolve`](Self::resolve) takes `&self`.
pub struct ResolutionContext {
    catalog: Arc<LabelCatalog>,
    classifier: ClassifierAdapter,
    index: SemanticIndex,
    top_k: usize,
}

impl ResolutionContext {
    /// Assemble a context, running the load-time validation pass.
    ///
    /// The classifier and the index must both have been built on `catalog`
    /// (same contents); each already checked its own artifact against it.
    pub fn new(
        config: &ModelConfig,
        catalog: Arc<LabelCatalog>,
        classifier: ClassifierAdapter,
        index: SemanticIndex,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if !same_catalog(classifier.catalog(), &catalog) {
            return Err(ConfigError::CatalogMismatch {
                component: "classifier",
            });
        }
        if !same_catalog(index.catalog(), &catalog) {
            return Err(ConfigError::CatalogMismatch {
                component: "semantic index",
            });
        }

        Ok(Self {
            catalog,
            classifier,
            index,
            top_k: config.top_k,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Token length the classifier pads to, if its backend has one.
    pub fn max_length(&self) -> Option<usize> {
        self.classifier.max_length()
    }

    pub fn embedding_dim(&self) -> usize {
        self.index.dim()
    }

    pub fn classifier_classes(&self) -> Option<usize> {
        self.classifier.num_classes()
    }

    /// Resolve a raw utterance to a canonical label, with the evidence.
    pub fn resolve(&self, text: &str) -> Result<Resolution, ResolveError> {
        let normalized = normalize_utterance(text);
        let classifier_label = self.classifier.classify(&normalized)?;
        let candidates = self.index.search(&normalized, self.top_k)?;
        let (label, verdict) = arbitrate(&classifier_label, &candidates)?;

        debug!(
            normalized = %normalized,
            classifier = %classifier_label,
            resolved = %label,
            verdict = verdict.as_str(),
            "resolved utterance"
        );

        Ok(Resolution {
            label,
            normalized,
            classifier_label,
            candidates,
            verdict,
        })
    }

    /// Resolve a raw utterance to just its canonical label.
    pub fn resolve_label(&self, text: &str) -> Result<String, ResolveError> {
        self.resolve(text).map(|r| r.label)
    }
}

fn same_catalog(a: &Arc<LabelCatalog>, b: &Arc<LabelCatalog>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

#[cfg(feature = "onnx")]
impl ResolutionContext {
    /// Load every artifact named by `config` and validate them together.
    pub fn load(config: &ModelConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        config.validate()?;

        let catalog = Arc::new(
            answerbook_store::load_catalog(&config.catalog_path).context("loading label catalog")?,
        );
        let references = answerbook_store::ReferenceEmbeddings::load(&config.embeddings_path)
            .context("loading reference embeddings")?;

        let model = crate::OnnxClassifier::load(&config.classifier_dir, config.max_length)
            .context("loading sequence classifier")?;
        let classifier = ClassifierAdapter::new(Box::new(model), catalog.clone())?;

        let encoder =
            crate::Embedder::load(&config.encoder_dir).context("loading sentence encoder")?;
        let index = SemanticIndex::new(Box::new(encoder), catalog.clone(), references)?;

        let context = Self::new(config, catalog, classifier, index)?;
        tracing::info!(
            labels = context.catalog.len(),
            dim = context.embedding_dim(),
            top_k = context.top_k,
            max_length = config.max_length,
            "resolution context ready"
        );
        Ok(context)
    }
}
