//! The pluggable classifier capability.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::matrix::FeatureMatrix;

/// A probabilistic multi-class classifier.
///
/// The policy engine treats the classifier as a capability: anything that
/// can fit on a feature matrix with dense integer targets, emit per-class
/// probabilities in target order, and have its hyperparameters set by name
/// is pluggable. `Clone` doubles as the "fresh estimator" operation: grid
/// search, every cross-validation fold and the final fit each work on a
/// distinct clone, never on a shared instance.
pub trait ProbabilisticClassifier: Clone + Serialize + DeserializeOwned {
    /// Fit on `x` with dense class codes `y` (one per row of `x`).
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize]) -> Result<()>;

    /// Per-row class probabilities, ordered by dense class code.
    fn predict_probabilities(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f32>>>;

    /// Set one hyperparameter by name.
    ///
    /// Names the classifier does not know are ignored, so a shared search
    /// grid can span classifier kinds.
    fn set_param(&mut self, name: &str, value: &serde_json::Value);
}
