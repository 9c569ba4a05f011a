//! Default classifier: multinomial logistic regression.
//!
//! Small, deterministic, dependency-free: weights are zero-initialized and
//! trained by full-batch gradient descent, so fitting the same data twice
//! yields the same model. Good enough as the out-of-the-box estimator;
//! anything implementing [`ProbabilisticClassifier`] can replace it.

use serde::{Deserialize, Serialize};
use zugwahl_core::error::{PolicyError, Result};
use zugwahl_core::matrix::FeatureMatrix;
use zugwahl_core::classifier::ProbabilisticClassifier;

/// Softmax regression over dense class codes.
///
/// Weights are stored flattened as `num_classes * (num_features + 1)` with
/// the bias folded in as the last column of each class row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Gradient-descent step size.
    pub learning_rate: f32,
    /// Number of full-batch passes over the training data.
    pub epochs: usize,
    /// L2 weight-decay coefficient.
    pub l2_penalty: f32,
    num_classes: usize,
    num_features: usize,
    weights: Vec<f32>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 200,
            l2_penalty: 1e-4,
            num_classes: 0,
            num_features: 0,
            weights: Vec::new(),
        }
    }
}

impl LogisticRegression {
    /// Number of classes the model was fitted on; 0 before fitting.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn is_fitted(&self) -> bool {
        !self.weights.is_empty()
    }

    /// Raw class scores for one input row, bias included.
    fn scores(&self, row: &[f32]) -> Vec<f32> {
        let stride = self.num_features + 1;
        (0..self.num_classes)
            .map(|c| {
                let w = &self.weights[c * stride..(c + 1) * stride];
                let dot: f32 = w.iter().zip(row.iter()).map(|(a, b)| a * b).sum();
                dot + w[self.num_features]
            })
            .collect()
    }
}

/// Numerically stable in-place softmax.
fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    for s in scores.iter_mut() {
        *s /= sum;
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize]) -> Result<()> {
        if x.is_empty() || y.len() != x.rows() {
            return Err(PolicyError::InvalidFeatureShape(format!(
                "{} feature rows for {} targets",
                x.rows(),
                y.len()
            )));
        }
        // Dense codes: the class count is the highest code + 1.
        self.num_classes = y.iter().max().map_or(0, |&m| m + 1);
        self.num_features = x.cols();
        let stride = self.num_features + 1;
        self.weights = vec![0.0; self.num_classes * stride];

        let n = x.rows() as f32;
        for _ in 0..self.epochs {
            let mut gradient = vec![0.0f32; self.weights.len()];
            for (row, &target) in x.iter_rows().zip(y.iter()) {
                let mut probs = self.scores(row);
                softmax(&mut probs);
                for (c, &p) in probs.iter().enumerate() {
                    let delta = p - if c == target { 1.0 } else { 0.0 };
                    let g = &mut gradient[c * stride..(c + 1) * stride];
                    for (gj, &xj) in g.iter_mut().zip(row.iter()) {
                        *gj += delta * xj;
                    }
                    g[self.num_features] += delta;
                }
            }
            for (i, (w, g)) in self.weights.iter_mut().zip(gradient.iter()).enumerate() {
                // The intercept column is not regularized.
                let decay = if i % stride == self.num_features {
                    0.0
                } else {
                    self.l2_penalty * *w
                };
                *w -= self.learning_rate * (g / n + decay);
            }
        }
        Ok(())
    }

    fn predict_probabilities(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f32>>> {
        if !self.is_fitted() {
            return Err(PolicyError::NotTrained);
        }
        if x.cols() != self.num_features {
            return Err(PolicyError::InvalidFeatureShape(format!(
                "input has {} features, model was fitted on {}",
                x.cols(),
                self.num_features
            )));
        }
        Ok(x.iter_rows()
            .map(|row| {
                let mut probs = self.scores(row);
                softmax(&mut probs);
                probs
            })
            .collect())
    }

    fn set_param(&mut self, name: &str, value: &serde_json::Value) {
        match name {
            "learning_rate" => {
                if let Some(v) = value.as_f64() {
                    self.learning_rate = v as f32;
                }
            }
            "epochs" => {
                if let Some(v) = value.as_u64() {
                    self.epochs = v as usize;
                }
            }
            "l2_penalty" => {
                if let Some(v) = value.as_f64() {
                    self.l2_penalty = v as f32;
                }
            }
            // Unknown names are ignored so one grid can span model kinds.
            _ => {}
        }
    }
}
