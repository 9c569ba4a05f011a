//! Dialogue-state types shared across the workspace.
//!
//! A conversation reaches this crate already encoded: upstream NLU and
//! state tracking turn every step of a dialogue into fixed-width numeric
//! vectors. The types here only carry those vectors around; they never
//! interpret them.

use serde::{Deserialize, Serialize};

/// Encoded features of a single dialogue turn.
///
/// Each field is an opaque fixed-width numeric vector produced by the
/// upstream encoder. All turns of one dialogue share per-field widths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnFeatures {
    /// Observed-intent vector for this turn.
    pub intent: Vec<f32>,
    /// Vector describing the system action taken before this turn.
    pub prev_action: Vec<f32>,
    /// Slot-value vector at this turn.
    pub slots: Vec<f32>,
}

impl TurnFeatures {
    pub fn new(intent: Vec<f32>, prev_action: Vec<f32>, slots: Vec<f32>) -> Self {
        Self {
            intent,
            prev_action,
            slots,
        }
    }
}

/// The evolving record of one conversation, consumed opaquely.
///
/// Trackers arrive with their turns already encoded; this core never
/// re-runs NLU on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    /// Encoded turns, oldest first.
    pub turns: Vec<TurnFeatures>,
}

impl Tracker {
    pub fn new(turns: Vec<TurnFeatures>) -> Self {
        Self { turns }
    }

    pub fn push_turn(&mut self, turn: TurnFeatures) {
        self.turns.push(turn);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// The full enumerated action space of a conversational assistant.
///
/// Training typically only observes a subset of these actions; prediction
/// must still produce one probability per action defined here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    actions: Vec<String>,
}

impl Domain {
    pub fn new(actions: Vec<String>) -> Self {
        Self { actions }
    }

    /// Size of the full action space.
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Position of a named action in the action space.
    #[must_use]
    pub fn index_of(&self, action: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    /// Name of the action at `index`, if in range.
    #[must_use]
    pub fn action_name(&self, index: usize) -> Option<&str> {
        self.actions.get(index).map(String::as_str)
    }
}

/// Natural-language interpreter capability.
///
/// Passed through to the tracker featurizer untouched; this core never
/// inspects it beyond the identifier used in logs.
pub trait Interpreter {
    /// Identifier used in logs.
    fn name(&self) -> &str;
}

/// Interpreter stand-in for pipelines whose trackers arrive fully encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterpreter;

impl Interpreter for NoopInterpreter {
    fn name(&self) -> &str {
        "noop"
    }
}
