//! The tracker-featurizer capability.

use crate::error::Result;
use crate::state::{Domain, Interpreter, Tracker, TurnFeatures};

/// Converts dialogue trackers into per-turn feature histories.
///
/// Implementations own the windowing policy (how many past turns each
/// training/inference example encodes) and their own persistence format.
pub trait TrackerFeaturizer {
    /// One encoded history per tracker, oldest turn first.
    fn featurize_trackers(
        &self,
        trackers: &[Tracker],
        domain: &Domain,
        interpreter: &dyn Interpreter,
    ) -> Result<Vec<Vec<TurnFeatures>>>;

    /// Configured cap on encoded turns per example, if any.
    fn max_history(&self) -> Option<usize>;
}
