//! Persist/load round trip across the whole policy.

use tempfile::TempDir;
use zugwahl_core::state::{Domain, NoopInterpreter, Tracker, TurnFeatures};
use zugwahl_policy::{ClassifierPolicy, LogisticRegression, MaxHistoryFeaturizer, Scoring};

fn turn(intent_idx: usize, prev_action_idx: usize) -> TurnFeatures {
    let mut intent = vec![0.0; 3];
    intent[intent_idx] = 1.0;
    let mut prev_action = vec![0.0; 3];
    prev_action[prev_action_idx] = 1.0;
    TurnFeatures::new(intent, prev_action, vec![0.0, 1.0])
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

fn trained_policy(domain: &Domain) -> ClassifierPolicy {
    let greet = domain.index_of("greet").expect("greet in domain");
    let bye = domain.index_of("bye").expect("bye in domain");
    let trackers = vec![
        Tracker::new(vec![turn(0, 0), turn(0, 1)]),
        Tracker::new(vec![turn(0, 1)]),
        Tracker::new(vec![turn(1, 0), turn(1, 2)]),
        Tracker::new(vec![turn(1, 2)]),
    ];
    let labels = vec![greet, greet, bye, bye];

    // Shuffling off so both predictions in this test come from the same
    // deterministic fit.
    let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)))
        .with_priority(3)
        .with_scoring(Scoring::Accuracy)
        .with_shuffle(false);
    policy
        .train(&trackers, &labels, domain, &NoopInterpreter)
        .expect("training succeeds");
    policy
}

#[test]
fn loaded_policy_predicts_identically() {
    let domain = domain();
    let policy = trained_policy(&domain);
    let probe = Tracker::new(vec![turn(0, 0)]);
    let before = policy
        .predict_action_probabilities(&probe, &domain, &NoopInterpreter)
        .expect("predict before persist");

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("classifier_policy");
    policy.persist(&path).expect("persist");

    let loaded = ClassifierPolicy::<LogisticRegression>::load(&path).expect("load");
    assert_eq!(loaded.priority(), 3);
    assert!(loaded.is_trained());

    let after = loaded
        .predict_action_probabilities(&probe, &domain, &NoopInterpreter)
        .expect("predict after load");
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert!((b - a).abs() < 1e-6, "prediction drifted: {b} vs {a}");
    }
}

#[test]
fn persisted_directory_has_the_documented_layout() {
    let domain = domain();
    let policy = trained_policy(&domain);
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("classifier_policy");
    policy.persist(&path).expect("persist");

    assert!(path.join(zugwahl_policy::featurizer::FEATURIZER_FILE).is_file());
    assert!(path.join(zugwahl_policy::METADATA_FILE).is_file());
    assert!(path.join(zugwahl_policy::MODEL_FILE).is_file());

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(path.join(zugwahl_policy::METADATA_FILE)).expect("read metadata"),
    )
    .expect("metadata is valid JSON");
    assert_eq!(metadata["priority"], 3);
}
