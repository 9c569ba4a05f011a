//! Bijective mapping between action labels and dense class codes.
//!
//! Classifiers want contiguous integer targets `[0, n)`; the domain's
//! action space is sparse from the classifier's point of view because
//! training rarely observes every action. The codec is fitted once per
//! training run, travels with the model through persistence, and is never
//! refitted on load.

use serde::{Deserialize, Serialize};
use zugwahl_core::error::{PolicyError, Result};

/// Fitted bijection between seen action labels and dense codes.
///
/// Codes are assigned over the sorted distinct labels, so the mapping is
/// independent of the order labels appear in the training batch. Every
/// policy owns its own codec instance; codecs are never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<usize>,
}

impl LabelCodec {
    /// Build the bijection from the labels of one training run.
    ///
    /// # Errors
    /// `EmptyLabelSet` when called with zero labels.
    pub fn fit(&mut self, labels: &[usize]) -> Result<()> {
        if labels.is_empty() {
            return Err(PolicyError::EmptyLabelSet);
        }
        let mut classes = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;
        Ok(())
    }

    /// Number of distinct labels seen during `fit`.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    /// Map seen labels to dense codes.
    ///
    /// # Errors
    /// `UnknownLabel` for any label outside the fit set. On the training
    /// path this cannot trigger (codes cover the training labels by
    /// construction); hitting it means a pipeline invariant was broken.
    pub fn encode(&self, labels: &[usize]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|&label| {
                self.classes
                    .binary_search(&label)
                    .map_err(|_| PolicyError::UnknownLabel(label))
            })
            .collect()
    }

    /// Map dense codes back to the original action labels.
    ///
    /// Used to place classifier output back into action-space positions;
    /// never to invent labels for codes outside the fit set.
    ///
    /// # Errors
    /// `UnknownCode` for codes `>= num_classes()`.
    pub fn decode(&self, codes: &[usize]) -> Result<Vec<usize>> {
        codes
            .iter()
            .map(|&code| {
                self.classes
                    .get(code)
                    .copied()
                    .ok_or(PolicyError::UnknownCode(code))
            })
            .collect()
    }
}
