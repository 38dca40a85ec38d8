//! The closed catalog of canonical response labels.
//!
//! A catalog maps each label to the class id the classifier emits for it.
//! Ids are exactly `0..N-1`; catalog order is ascending id, so the label at
//! position `i` is the one with class id `i`.

use std::collections::HashMap;

use crate::ConfigError;

/// Ordered, validated mapping from canonical label to class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    /// Labels in class-id order.
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LabelCatalog {
    /// Build a catalog from `(label, class_id)` pairs in any order.
    ///
    /// Rejects empty labels, negative or duplicate ids, and id sets that are
    /// not exactly `0..N-1`. An empty input yields an empty catalog.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut by_id: Vec<(i64, String)> = Vec::new();
        for (label, id) in pairs {
            let label = label.into();
            if label.is_empty() {
                return Err(ConfigError::EmptyLabel);
            }
            if id < 0 {
                return Err(ConfigError::NegativeClassId { label, id });
            }
            by_id.push((id, label));
        }

        by_id.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for pair in by_id.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(ConfigError::DuplicateClassId {
                    id: pair[0].0,
                    first: pair[0].1.clone(),
                    second: pair[1].1.clone(),
                });
            }
        }

        // Sorted, unique and non-negative: contiguous iff the last id is N-1.
        if let Some(&(max_id, _)) = by_id.last()
            && max_id != by_id.len() as i64 - 1
        {
            return Err(ConfigError::NonContiguousClassIds {
                size: by_id.len(),
                max_id,
            });
        }

        let labels: Vec<String> = by_id.into_iter().map(|(_, label)| label).collect();
        let mut positions = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if positions.insert(label.clone(), i).is_some() {
                return Err(ConfigError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self { labels, positions })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Reverse lookup: class id → label.
    pub fn label_for_id(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Forward lookup: label → class id (equal to its catalog position).
    pub fn id_for_label(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    /// Labels in catalog order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
