//! Train a small policy on synthetic dialogues and print the predicted
//! next-action distribution as JSON.
//!
//! Run with `cargo run -p zugwahl-policy --example train_predict`.

use serde_json::json;
use zugwahl_core::state::{Domain, NoopInterpreter, Tracker, TurnFeatures};
use zugwahl_policy::{ClassifierPolicy, MaxHistoryFeaturizer};

fn turn(intent_idx: usize, prev_action_idx: usize) -> TurnFeatures {
    let mut intent = vec![0.0; 2];
    intent[intent_idx] = 1.0;
    let mut prev_action = vec![0.0; 2];
    prev_action[prev_action_idx] = 1.0;
    TurnFeatures::new(intent, prev_action, vec![0.0, 0.0])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let domain = Domain::new(vec![
        "listen".into(),
        "greet".into(),
        "bye".into(),
        "affirm".into(),
        "deny".into(),
    ]);
    let greet = domain.index_of("greet").ok_or("greet not in domain")?;
    let bye = domain.index_of("bye").ok_or("bye not in domain")?;

    let trackers = vec![
        Tracker::new(vec![turn(0, 0), turn(0, 1)]),
        Tracker::new(vec![turn(0, 1), turn(0, 0)]),
        Tracker::new(vec![turn(1, 0), turn(1, 1)]),
        Tracker::new(vec![turn(1, 1)]),
    ];
    let labels = vec![greet, greet, bye, bye];

    let mut policy = ClassifierPolicy::new(MaxHistoryFeaturizer::new(Some(2)));
    policy.train(&trackers, &labels, &domain, &NoopInterpreter)?;

    let probe = Tracker::new(vec![turn(0, 0)]);
    let probabilities = policy.predict_action_probabilities(&probe, &domain, &NoopInterpreter)?;

    let named: Vec<_> = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| {
            json!({
                "action": domain.action_name(i).unwrap_or("?"),
                "probability": p,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "next_action": named }))?);
    Ok(())
}
