#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Classifier-backed dialogue next-action policy.
//!
//! [`ClassifierPolicy`] ties the workspace together: it featurizes
//! training trackers through a [`MaxHistoryFeaturizer`], fits a
//! [`ProbabilisticClassifier`] on the assembled feature matrix (directly,
//! or via grid search with k-fold cross-validation), and at inference
//! time expands the model's raw class probabilities back over the full
//! action space. The whole policy state persists to a directory and loads
//! back behaviorally identical.

pub mod featurizer;
pub mod model;
pub mod search;

pub use featurizer::MaxHistoryFeaturizer;
pub use model::LogisticRegression;
pub use search::{ParamGrid, Scoring};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use zugwahl_core::classifier::ProbabilisticClassifier;
use zugwahl_core::error::{PolicyError, Result};
use zugwahl_core::featurizer::TrackerFeaturizer;
use zugwahl_core::state::{Domain, Interpreter, Tracker};
use zugwahl_features::{assemble_features, LabelCodec};

/// Structured-text metadata record inside the policy directory.
pub const METADATA_FILE: &str = "policy.json";
/// Opaque binary blob holding the trained policy state.
pub const MODEL_FILE: &str = "model.bin";

/// Default arbitration priority attached to a fresh policy.
pub const DEFAULT_POLICY_PRIORITY: i32 = 1;

/// Fallback timestamp when formatting fails.
const FALLBACK_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

fn iso8601_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| FALLBACK_TIMESTAMP.to_string())
}

/// Expand per-code class probabilities over the full action space.
///
/// The classifier only knows the labels seen during training; actions the
/// codec never saw stay at exactly 0.0. Probability mass is placed, never
/// renormalized, so the seen entries still sum to the model's original
/// mass. The result always has `num_actions` entries, however few labels
/// training observed.
///
/// # Errors
/// `UnknownCode` when the model emits more classes than the codec knows;
/// `UnknownLabel` when a decoded label falls outside the action space.
/// Either means training and domain drifted apart.
pub fn reconcile_probabilities(
    probabilities: &[f32],
    codec: &LabelCodec,
    num_actions: usize,
) -> Result<Vec<f32>> {
    let mut filled = vec![0.0f32; num_actions];
    for (code, &probability) in probabilities.iter().enumerate() {
        let label = codec
            .decode(&[code])?
            .first()
            .copied()
            .ok_or(PolicyError::UnknownCode(code))?;
        let slot = filled
            .get_mut(label)
            .ok_or(PolicyError::UnknownLabel(label))?;
        *slot = probability;
    }
    Ok(filled)
}

/// Metadata record persisted as structured text.
#[derive(Debug, Serialize, Deserialize)]
struct PolicyMetadata {
    priority: i32,
    trained_at: String,
}

/// Everything that travels through the opaque persistence blob.
#[derive(Debug, Serialize, Deserialize)]
struct PolicyState<M> {
    model: M,
    cv: Option<usize>,
    param_grid: Option<ParamGrid>,
    scoring: Scoring,
    label_codec: LabelCodec,
}

/// Dialogue policy backed by a probabilistic classifier.
///
/// Training replaces the fitted model wholesale; there is no incremental
/// update. One instance must not see concurrent train/predict calls;
/// callers serialize access.
#[derive(Debug, Clone)]
pub struct ClassifierPolicy<M: ProbabilisticClassifier = LogisticRegression> {
    featurizer: MaxHistoryFeaturizer,
    priority: i32,
    /// Unfitted model architecture; every fit works on a clone of this.
    template: M,
    model: Option<M>,
    cv: Option<usize>,
    param_grid: Option<ParamGrid>,
    scoring: Scoring,
    label_codec: LabelCodec,
    shuffle: bool,
}

impl ClassifierPolicy<LogisticRegression> {
    /// Policy with the default logistic-regression model.
    #[must_use]
    pub fn new(featurizer: MaxHistoryFeaturizer) -> Self {
        Self::with_model(featurizer, LogisticRegression::default())
    }
}

impl<M: ProbabilisticClassifier> ClassifierPolicy<M> {
    /// Policy around a custom model architecture.
    #[must_use]
    pub fn with_model(featurizer: MaxHistoryFeaturizer, template: M) -> Self {
        Self {
            featurizer,
            priority: DEFAULT_POLICY_PRIORITY,
            template,
            model: None,
            cv: None,
            param_grid: None,
            scoring: Scoring::default(),
            // Each policy owns an independent codec; codecs are never
            // shared across instances.
            label_codec: LabelCodec::default(),
            shuffle: true,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Enable grid search with `folds`-fold cross-validation.
    #[must_use]
    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv = Some(folds);
        self
    }

    /// Hyperparameter grid; only consulted when cross-validation is on.
    #[must_use]
    pub fn with_param_grid(mut self, grid: ParamGrid) -> Self {
        self.param_grid = Some(grid);
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Whether to shuffle the training batch before fitting.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn featurizer(&self) -> &MaxHistoryFeaturizer {
        &self.featurizer
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Fit the policy on a batch of trackers and their next-action labels.
    ///
    /// Labels are action-space indices (`Domain::index_of`). Histories and
    /// labels are shuffled with the same permutation when shuffling is on,
    /// a fresh label codec is fitted, features are assembled, and the
    /// model is fitted either directly or through grid search when a
    /// cross-validation fold count is configured. On success the previous
    /// model and codec are replaced wholesale; the cross-validated score,
    /// when one was computed, is logged.
    ///
    /// # Errors
    /// `InvalidFeatureShape` on malformed or mismatched inputs (fatal, not
    /// retried), `EmptyLabelSet` on a zero-label batch, and
    /// `CrossValidation` on a degenerate fold setup.
    pub fn train(
        &mut self,
        trackers: &[Tracker],
        labels: &[usize],
        domain: &Domain,
        interpreter: &dyn Interpreter,
    ) -> Result<()> {
        if trackers.len() != labels.len() {
            return Err(PolicyError::InvalidFeatureShape(format!(
                "{} trackers for {} labels",
                trackers.len(),
                labels.len()
            )));
        }
        let histories = self
            .featurizer
            .featurize_trackers(trackers, domain, interpreter)?;

        let mut examples: Vec<_> = histories.into_iter().zip(labels.iter().copied()).collect();
        if self.shuffle {
            use rand::seq::SliceRandom;
            examples.shuffle(&mut rand::thread_rng());
        }
        let (histories, labels): (Vec<_>, Vec<usize>) = examples.into_iter().unzip();

        let mut codec = LabelCodec::default();
        codec.fit(&labels)?;
        let codes = codec.encode(&labels)?;
        let x = assemble_features(&histories, self.featurizer.max_history())?;

        let (model, cv_score) = match self.cv {
            None => {
                let mut model = self.template.clone();
                model.fit(&x, &codes)?;
                (model, None)
            }
            Some(folds) => {
                let grid = self.param_grid.clone().unwrap_or_default();
                let (model, score) =
                    search::search_and_score(&self.template, &x, &codes, &grid, folds, self.scoring)?;
                (model, Some(score))
            }
        };

        self.label_codec = codec;
        self.model = Some(model);
        info!("Done fitting classifier policy model");
        if let Some(score) = cv_score {
            info!(score, "Cross-validation score");
        }
        Ok(())
    }

    /// Probability of each action in the domain being the next system
    /// action, given one tracker.
    ///
    /// The returned vector always has `domain.num_actions()` entries;
    /// actions never seen during training carry exactly 0.0.
    ///
    /// # Errors
    /// `NotTrained` before the first successful [`Self::train`];
    /// featurization and shape errors propagate unchanged.
    pub fn predict_action_probabilities(
        &self,
        tracker: &Tracker,
        domain: &Domain,
        interpreter: &dyn Interpreter,
    ) -> Result<Vec<f32>> {
        let model = self.model.as_ref().ok_or(PolicyError::NotTrained)?;
        let histories =
            self.featurizer
                .featurize_trackers(std::slice::from_ref(tracker), domain, interpreter)?;
        let x = assemble_features(&histories, self.featurizer.max_history())?;
        let probabilities = model.predict_probabilities(&x)?;
        let row = probabilities.first().ok_or_else(|| {
            PolicyError::InvalidFeatureShape("classifier returned no probability rows".to_string())
        })?;
        reconcile_probabilities(row, &self.label_codec, domain.num_actions())
    }

    /// Persist the policy into `path` as a unit: the featurizer's own
    /// file, the metadata record and the opaque state blob.
    ///
    /// Calling this on an untrained policy logs a warning and writes
    /// nothing. This is deliberately a no-op, not an error.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let Some(model) = &self.model else {
            warn!("Persist called without a trained model present, nothing to persist");
            return Ok(());
        };
        fs::create_dir_all(path)?;
        self.featurizer.persist(path)?;

        let metadata = PolicyMetadata {
            priority: self.priority,
            trained_at: iso8601_now(),
        };
        fs::write(
            path.join(METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        let state = PolicyState {
            model: model.clone(),
            cv: self.cv,
            param_grid: self.param_grid.clone(),
            scoring: self.scoring,
            label_codec: self.label_codec.clone(),
        };
        fs::write(path.join(MODEL_FILE), bincode::serialize(&state)?)?;
        Ok(())
    }

    /// Reconstruct a policy persisted into `path`.
    ///
    /// Builds a fresh policy shell from the loaded featurizer and
    /// metadata, then merges the state blob over it. The loaded policy
    /// predicts identically to the persisted one.
    ///
    /// # Errors
    /// `PathNotFound` when the directory does not exist;
    /// `FeaturizerTypeMismatch` when the persisted featurizer is of a
    /// different kind; I/O and decoding errors from the individual files.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(PolicyError::PathNotFound(path.to_path_buf()));
        }
        let featurizer = MaxHistoryFeaturizer::load(path)?;
        let metadata: PolicyMetadata =
            serde_json::from_str(&fs::read_to_string(path.join(METADATA_FILE))?)?;
        let state: PolicyState<M> = bincode::deserialize(&fs::read(path.join(MODEL_FILE))?)?;

        let policy = Self {
            featurizer,
            priority: metadata.priority,
            template: state.model.clone(),
            model: Some(state.model),
            cv: state.cv,
            param_grid: state.param_grid,
            scoring: state.scoring,
            label_codec: state.label_codec,
            shuffle: true,
        };
        info!("Loaded classifier policy model");
        Ok(policy)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zugwahl_core::state::{NoopInterpreter, TurnFeatures};

    // 2-wide one-hot intent/action vectors, 2-wide slot vector.
    fn turn(intent_idx: usize, prev_action_idx: usize) -> TurnFeatures {
        let mut intent = vec![0.0, 0.0];
        intent[intent_idx] = 1.0;
        let mut prev_action = vec![0.0, 0.0];
        prev_action[prev_action_idx] = 1.0;
        TurnFeatures::new(intent, prev_action, vec![0.0, 0.0])
    }

    fn domain() -> Domain {
        Domain::new(vec![
            "listen".into(),
            "greet".into(),
            "bye".into(),
            "affirm".into(),
            "deny".into(),
        ])
    }

    /// Three histories of length 2, two distinct labels.
    fn training_batch(domain: &Domain) -> (Vec<Tracker>, Vec<usize>) {
        let greet = domain.index_of("greet").unwrap();
        let bye = domain.index_of("bye").unwrap();
        let trackers = vec![
            Tracker::new(vec![turn(0, 0), turn(0, 1)]),
            Tracker::new(vec![turn(0, 1), turn(0, 0)]),
            Tracker::new(vec![turn(1, 0), turn(1, 1)]),
        ];
        (trackers, vec![greet, greet, bye])
    }

    #[test]
    fn trains_and_predicts_over_the_full_action_space() {
        let domain = domain();
        let (trackers, labels) = training_batch(&domain);
        let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)));
        policy
            .train(&trackers, &labels, &domain, &NoopInterpreter)
            .unwrap();

        let probe = Tracker::new(vec![turn(0, 0)]);
        let probabilities = policy
            .predict_action_probabilities(&probe, &domain, &NoopInterpreter)
            .unwrap();

        assert_eq!(probabilities.len(), domain.num_actions());
        let non_zero = probabilities.iter().filter(|p| **p > 0.0).count();
        assert_eq!(non_zero, 2, "only the two seen labels carry mass");
        let mass: f32 = probabilities.iter().sum();
        assert!(mass <= 1.0 + 1e-5);
    }

    #[test]
    fn predict_before_train_is_fatal() {
        let domain = domain();
        let policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)));
        let probe = Tracker::new(vec![turn(0, 0)]);
        assert!(matches!(
            policy
                .predict_action_probabilities(&probe, &domain, &NoopInterpreter)
                .unwrap_err(),
            PolicyError::NotTrained
        ));
    }

    #[test]
    fn train_rejects_mismatched_labels_and_empty_label_set() {
        let domain = domain();
        let (trackers, _) = training_batch(&domain);
        let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)));
        assert!(matches!(
            policy
                .train(&trackers, &[0], &domain, &NoopInterpreter)
                .unwrap_err(),
            PolicyError::InvalidFeatureShape(_)
        ));
        assert!(matches!(
            policy
                .train(&[], &[], &domain, &NoopInterpreter)
                .unwrap_err(),
            PolicyError::EmptyLabelSet
        ));
    }

    #[test]
    fn shuffled_training_still_learns_the_pairing() {
        let domain = domain();
        let (trackers, labels) = training_batch(&domain);
        let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2))).with_shuffle(true);
        policy
            .train(&trackers, &labels, &domain, &NoopInterpreter)
            .unwrap();

        let greet = domain.index_of("greet").unwrap();
        let bye = domain.index_of("bye").unwrap();
        let probabilities = policy
            .predict_action_probabilities(
                &Tracker::new(vec![turn(1, 0), turn(1, 1)]),
                &domain,
                &NoopInterpreter,
            )
            .unwrap();
        assert!(
            probabilities[bye] > probabilities[greet],
            "a shuffled batch must keep rows and labels aligned"
        );
    }

    #[test]
    fn cross_validated_training_fits_a_model() {
        let domain = domain();
        let greet = domain.index_of("greet").unwrap();
        let bye = domain.index_of("bye").unwrap();
        let mut trackers = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..4 {
            trackers.push(Tracker::new(vec![turn(0, 0), turn(0, 1)]));
            labels.push(greet);
            trackers.push(Tracker::new(vec![turn(1, 0), turn(1, 1)]));
            labels.push(bye);
        }
        let mut grid = ParamGrid::new();
        grid.insert("epochs".into(), vec![serde_json::json!(100)]);

        let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)))
            .with_cv(2)
            .with_param_grid(grid);
        policy
            .train(&trackers, &labels, &domain, &NoopInterpreter)
            .unwrap();
        assert!(policy.is_trained());
    }

    #[test]
    fn reconciliation_keeps_unseen_actions_at_zero() {
        let mut codec = LabelCodec::default();
        codec.fit(&[1, 3]).unwrap();
        let filled = reconcile_probabilities(&[0.7, 0.3], &codec, 5).unwrap();
        assert_eq!(filled.len(), 5);
        assert_eq!(filled, vec![0.0, 0.7, 0.0, 0.3, 0.0]);
        let mass: f32 = filled.iter().sum();
        assert!((mass - 1.0).abs() < 1e-6, "mass is placed, not renormalized");
    }

    #[test]
    fn reconciliation_rejects_drifted_domains() {
        let mut codec = LabelCodec::default();
        codec.fit(&[1, 7]).unwrap();
        // action 7 does not fit into a 5-action domain
        assert!(matches!(
            reconcile_probabilities(&[0.5, 0.5], &codec, 5).unwrap_err(),
            PolicyError::UnknownLabel(7)
        ));
        // more classes than the codec knows
        assert!(matches!(
            reconcile_probabilities(&[0.2, 0.2, 0.6], &codec, 10).unwrap_err(),
            PolicyError::UnknownCode(2)
        ));
    }

    #[test]
    fn persist_without_training_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)));
        policy.persist(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn load_from_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nowhere");
        assert!(matches!(
            ClassifierPolicy::<LogisticRegression>::load(&missing).unwrap_err(),
            PolicyError::PathNotFound(_)
        ));
    }
}
