//! In-memory models for unit tests.

use std::collections::HashMap;
use std::time::Duration;

use answerbook_core::{LabelCatalog, ResolveError};

use crate::{SentenceEncoder, SequenceClassifier};

pub fn greetings() -> LabelCatalog {
    LabelCatalog::from_pairs([("greeting", 0), ("farewell", 1), ("thanks", 2)]).unwrap()
}

/// Returns canned logits per text; unknown texts get all-zero logits.
pub struct StubClassifier {
    classes: Option<usize>,
    width: usize,
    responses: HashMap<String, Vec<f32>>,
    fail: bool,
    delay: Option<Duration>,
}

impl StubClassifier {
    pub fn new(classes: usize) -> Self {
        Self {
            classes: Some(classes),
            width: classes,
            responses: HashMap::new(),
            fail: false,
            delay: None,
        }
    }

    /// A model that does not declare its class count up front.
    pub fn dynamic() -> Self {
        Self {
            classes: None,
            width: 0,
            responses: HashMap::new(),
            fail: false,
            delay: None,
        }
    }

    pub fn with(mut self, text: &str, logits: Vec<f32>) -> Self {
        self.responses.insert(text.to_string(), logits);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Block the calling thread for `delay` before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl SequenceClassifier for StubClassifier {
    fn num_classes(&self) -> Option<usize> {
        self.classes
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>, ResolveError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err(ResolveError::inference("stub classifier failure"));
        }
        Ok(self
            .responses
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.width]))
    }
}

/// Returns canned vectors per text; unknown texts get a fallback vector.
pub struct StubEncoder {
    dim: usize,
    fallback: Vec<f32>,
    vectors: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl StubEncoder {
    pub fn new(dim: usize) -> Self {
        let mut fallback = vec![0.0; dim];
        if let Some(first) = fallback.first_mut() {
            *first = 1.0;
        }
        Self {
            dim,
            fallback,
            vectors: HashMap::new(),
            fail: false,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl SentenceEncoder for StubEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ResolveError> {
        if self.fail {
            return Err(ResolveError::inference("stub encoder failure"));
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
