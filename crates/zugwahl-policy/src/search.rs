//! Hyperparameter grid search with k-fold cross-validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use zugwahl_core::classifier::ProbabilisticClassifier;
use zugwahl_core::error::{PolicyError, Result};
use zugwahl_core::matrix::FeatureMatrix;

/// Hyperparameter grid: parameter name to candidate values.
///
/// A `BTreeMap` keeps candidate enumeration order deterministic.
pub type ParamGrid = BTreeMap<String, Vec<Value>>;

/// Floor for probabilities entering a log, to keep the loss finite.
const LOG_LOSS_EPSILON: f32 = 1e-12;

/// Scoring strategy for cross-validated model selection. Higher is better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Fraction of validation rows whose top-probability class is the target.
    #[default]
    Accuracy,
    /// Mean log-probability of the target class (negated log loss).
    NegLogLoss,
}

impl Scoring {
    /// Score one validation fold from per-row class probabilities.
    pub(crate) fn score(self, probabilities: &[Vec<f32>], targets: &[usize]) -> f32 {
        if probabilities.is_empty() {
            return 0.0;
        }
        let n = probabilities.len() as f32;
        match self {
            Scoring::Accuracy => {
                let hits = probabilities
                    .iter()
                    .zip(targets.iter())
                    .filter(|(row, &target)| {
                        let best = row
                            .iter()
                            .enumerate()
                            .max_by(|a, b| a.1.total_cmp(b.1))
                            .map(|(i, _)| i);
                        best == Some(target)
                    })
                    .count();
                hits as f32 / n
            }
            Scoring::NegLogLoss => {
                let log_sum: f32 = probabilities
                    .iter()
                    .zip(targets.iter())
                    .map(|(row, &target)| {
                        // A fold's training half may miss classes present in
                        // the validation half; those get zero probability.
                        row.get(target)
                            .copied()
                            .unwrap_or(0.0)
                            .max(LOG_LOSS_EPSILON)
                            .ln()
                    })
                    .sum();
                log_sum / n
            }
        }
    }
}

/// Contiguous k-fold split over `rows` examples.
///
/// Returns `(train_indices, validation_indices)` per fold. The first
/// `rows % k` folds get one extra validation row.
pub(crate) fn kfold(rows: usize, k: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(PolicyError::CrossValidation(format!(
            "need at least 2 folds, got {k}"
        )));
    }
    if k > rows {
        return Err(PolicyError::CrossValidation(format!(
            "cannot split {rows} examples into {k} folds"
        )));
    }
    let base = rows / k;
    let remainder = rows % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < remainder);
        let validation: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..rows)
            .filter(|i| *i < start || *i >= start + size)
            .collect();
        folds.push((train, validation));
        start += size;
    }
    Ok(folds)
}

/// Expand a grid into the cartesian product of candidate parameter sets.
///
/// The empty grid yields a single empty candidate, so cross-validation
/// without a grid still scores the template's own hyperparameters.
fn candidates(grid: &ParamGrid) -> Result<Vec<BTreeMap<String, Value>>> {
    let mut out: Vec<BTreeMap<String, Value>> = vec![BTreeMap::new()];
    for (name, values) in grid {
        if values.is_empty() {
            return Err(PolicyError::CrossValidation(format!(
                "parameter '{name}' has no candidate values"
            )));
        }
        let mut next = Vec::with_capacity(out.len() * values.len());
        for base in &out {
            for value in values {
                let mut candidate = base.clone();
                candidate.insert(name.clone(), value.clone());
                next.push(candidate);
            }
        }
        out = next;
    }
    Ok(out)
}

fn apply_params<M: ProbabilisticClassifier>(model: &mut M, params: &BTreeMap<String, Value>) {
    for (name, value) in params {
        model.set_param(name, value);
    }
}

/// Grid search over `grid` with `cv`-fold cross-validation.
///
/// Every candidate is scored on fresh clones of `template`, one per fold;
/// the best candidate (first wins ties) is refit on the full data on
/// another fresh clone. Returns the fitted model and its mean
/// cross-validated score.
pub(crate) fn search_and_score<M: ProbabilisticClassifier>(
    template: &M,
    x: &FeatureMatrix,
    y: &[usize],
    grid: &ParamGrid,
    cv: usize,
    scoring: Scoring,
) -> Result<(M, f32)> {
    let folds = kfold(x.rows(), cv)?;
    let mut best: Option<(BTreeMap<String, Value>, f32)> = None;

    for params in candidates(grid)? {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for (train, validation) in &folds {
            let x_train = x.select_rows(train)?;
            let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
            let x_val = x.select_rows(validation)?;
            let y_val: Vec<usize> = validation.iter().map(|&i| y[i]).collect();

            let mut model = template.clone();
            apply_params(&mut model, &params);
            model.fit(&x_train, &y_train)?;
            let probabilities = model.predict_probabilities(&x_val)?;
            fold_scores.push(scoring.score(&probabilities, &y_val));
        }
        let mean = fold_scores.iter().sum::<f32>() / fold_scores.len() as f32;
        if best.as_ref().map_or(true, |(_, s)| mean > *s) {
            best = Some((params, mean));
        }
    }

    // candidates() always yields at least one entry.
    let (best_params, best_score) = best.ok_or_else(|| {
        PolicyError::CrossValidation("grid search produced no candidates".to_string())
    })?;
    debug!(?best_params, "grid search best parameters");

    let mut model = template.clone();
    apply_params(&mut model, &best_params);
    model.fit(x, y)?;
    Ok((model, best_score))
}
