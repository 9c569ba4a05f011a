//! Max-history tracker featurizer.
//!
//! Encodes each tracker as the window of its most recent turns. The turns
//! themselves arrive pre-encoded on the tracker; this featurizer only
//! applies the windowing policy and owns its own persistence file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zugwahl_core::error::{PolicyError, Result};
use zugwahl_core::featurizer::TrackerFeaturizer;
use zugwahl_core::state::{Domain, Interpreter, Tracker, TurnFeatures};

/// File the featurizer persists itself under, inside the policy directory.
pub const FEATURIZER_FILE: &str = "featurizer.json";

/// Windows each tracker to its last `max_history` turns.
///
/// With `max_history` unset, histories pass through at full length and
/// the downstream assembler derives its padding window from the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxHistoryFeaturizer {
    max_history: Option<usize>,
}

/// On-disk form, tagged with the concrete featurizer kind so `load` can
/// refuse a directory persisted by a different featurizer.
#[derive(Debug, Serialize, Deserialize)]
struct FeaturizerConfig {
    kind: String,
    max_history: Option<usize>,
}

impl MaxHistoryFeaturizer {
    /// Kind tag written to [`FEATURIZER_FILE`].
    pub const KIND: &'static str = "max_history";

    #[must_use]
    pub fn new(max_history: Option<usize>) -> Self {
        Self { max_history }
    }

    /// Write this featurizer's configuration into `path`.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let config = FeaturizerConfig {
            kind: Self::KIND.to_string(),
            max_history: self.max_history,
        };
        fs::write(
            path.join(FEATURIZER_FILE),
            serde_json::to_string_pretty(&config)?,
        )?;
        Ok(())
    }

    /// Reconstruct a featurizer previously persisted into `path`.
    ///
    /// # Errors
    /// `FeaturizerTypeMismatch` when the persisted kind tag is not
    /// [`Self::KIND`]; I/O and JSON errors from the file itself.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path.join(FEATURIZER_FILE))?;
        let config: FeaturizerConfig = serde_json::from_str(&raw)?;
        if config.kind != Self::KIND {
            return Err(PolicyError::FeaturizerTypeMismatch {
                expected: Self::KIND.to_string(),
                found: config.kind,
            });
        }
        Ok(Self {
            max_history: config.max_history,
        })
    }
}

impl TrackerFeaturizer for MaxHistoryFeaturizer {
    fn featurize_trackers(
        &self,
        trackers: &[Tracker],
        _domain: &Domain,
        _interpreter: &dyn Interpreter,
    ) -> Result<Vec<Vec<TurnFeatures>>> {
        Ok(trackers
            .iter()
            .map(|tracker| {
                let turns = &tracker.turns;
                let window = match self.max_history {
                    Some(k) if turns.len() > k => &turns[turns.len() - k..],
                    _ => &turns[..],
                };
                window.to_vec()
            })
            .collect())
    }

    fn max_history(&self) -> Option<usize> {
        self.max_history
    }
}
