//! Classifier adapter: logits → one canonical label.

use std::sync::Arc;

use answerbook_core::{ConfigError, LabelCatalog, ResolveError};

use crate::SequenceClassifier;

/// Index of the strictly largest logit.
///
/// Ties go to the lowest index (first occurrence), and NaN never wins.
/// Returns `None` for an empty or all-NaN vector.
pub fn select_class(logits: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &logit) in logits.iter().enumerate() {
        if logit.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if logit <= top => {}
            _ => best = Some((i, logit)),
        }
    }
    best.map(|(i, _)| i)
}

/// Wraps a [`SequenceClassifier`] and translates its decision into a label.
pub struct ClassifierAdapter {
    model: Box<dyn SequenceClassifier>,
    catalog: Arc<LabelCatalog>,
}

impl ClassifierAdapter {
    /// Pair a model with its catalog, rejecting a declared class count that
    /// disagrees with the catalog size.
    pub fn new(
        model: Box<dyn SequenceClassifier>,
        catalog: Arc<LabelCatalog>,
    ) -> Result<Self, ConfigError> {
        if let Some(classes) = model.num_classes()
            && classes != catalog.len()
        {
            return Err(ConfigError::ClassCountMismatch {
                classes,
                catalog_size: catalog.len(),
            });
        }
        Ok(Self { model, catalog })
    }

    pub fn num_classes(&self) -> Option<usize> {
        self.model.num_classes()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.model.max_length()
    }

    pub fn catalog(&self) -> &Arc<LabelCatalog> {
        &self.catalog
    }

    /// Predict the label for an already normalised text.
    pub fn classify(&self, text: &str) -> Result<String, ResolveError> {
        let logits = self.model.logits(text)?;

        // Graphs with a dynamic output dimension are only checked here.
        if logits.len() != self.catalog.len() {
            return Err(ConfigError::ClassCountMismatch {
                classes: logits.len(),
                catalog_size: self.catalog.len(),
            }
            .into());
        }

        let id = select_class(&logits)
            .ok_or_else(|| ResolveError::inference("classifier produced no comparable logit"))?;

        self.catalog
            .label_for_id(id)
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::UnknownClassId {
                    id,
                    catalog_size: self.catalog.len(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubClassifier, greetings};

    #[test]
    fn select_picks_largest() {
        assert_eq!(select_class(&[0.1, 2.5, -1.0]), Some(1));
        assert_eq!(select_class(&[-3.0, -2.0, -5.0]), Some(1));
    }

    #[test]
    fn select_ties_go_to_first() {
        assert_eq!(select_class(&[1.0, 3.0, 3.0, 0.0]), Some(1));
        assert_eq!(select_class(&[7.0, 7.0, 7.0]), Some(0));
    }

    #[test]
    fn select_skips_nan() {
        assert_eq!(select_class(&[f32::NAN, 0.5, 0.2]), Some(1));
        assert_eq!(select_class(&[0.5, f32::NAN, 0.9]), Some(2));
        assert_eq!(select_class(&[f32::NAN, f32::NAN]), None);
        assert_eq!(select_class(&[]), None);
    }

    #[test]
    fn classify_maps_id_to_label() {
        let model = StubClassifier::new(3).with("see you", vec![0.1, 4.0, 0.3]);
        let adapter = ClassifierAdapter::new(Box::new(model), Arc::new(greetings())).unwrap();

        assert_eq!(adapter.classify("see you").unwrap(), "farewell");
    }

    #[test]
    fn classify_tie_resolves_to_lowest_id() {
        let model = StubClassifier::new(3).with("hmm", vec![0.0, 2.0, 2.0]);
        let adapter = ClassifierAdapter::new(Box::new(model), Arc::new(greetings())).unwrap();

        assert_eq!(adapter.classify("hmm").unwrap(), "farewell");
    }

    #[test]
    fn declared_class_count_must_match_catalog() {
        let model = StubClassifier::new(4);
        let err = ClassifierAdapter::new(Box::new(model), Arc::new(greetings()))
            .err()
            .unwrap();
        assert_eq!(
            err,
            ConfigError::ClassCountMismatch {
                classes: 4,
                catalog_size: 3
            }
        );
    }

    #[test]
    fn runtime_logit_length_is_checked() {
        let model = StubClassifier::dynamic().with("hello", vec![1.0, 0.0]);
        let adapter = ClassifierAdapter::new(Box::new(model), Arc::new(greetings())).unwrap();

        let err = adapter.classify("hello").unwrap_err();
        assert!(err.is_config(), "{err}");
    }

    #[test]
    fn all_nan_logits_are_an_inference_error() {
        let model = StubClassifier::new(3).with("??", vec![f32::NAN; 3]);
        let adapter = ClassifierAdapter::new(Box::new(model), Arc::new(greetings())).unwrap();

        let err = adapter.classify("??").unwrap_err();
        assert!(matches!(err, ResolveError::Inference(_)));
    }

    #[test]
    fn model_failures_propagate() {
        let model = StubClassifier::new(3).failing();
        let adapter = ClassifierAdapter::new(Box::new(model), Arc::new(greetings())).unwrap();

        assert!(matches!(
            adapter.classify("anything").unwrap_err(),
            ResolveError::Inference(_)
        ));
    }
}
