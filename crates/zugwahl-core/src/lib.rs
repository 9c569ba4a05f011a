//! Core traits and types for the zugwahl dialogue-policy engine.
//!
//! This crate defines the seams the policy crates build on: encoded
//! dialogue state ([`TurnFeatures`], [`Tracker`], [`Domain`]), the flat
//! [`FeatureMatrix`] classifiers consume, the pluggable
//! [`ProbabilisticClassifier`] and [`TrackerFeaturizer`] capabilities, and
//! the shared error taxonomy.

pub mod classifier;
pub mod error;
pub mod featurizer;
pub mod matrix;
pub mod state;

pub use classifier::ProbabilisticClassifier;
pub use error::{PolicyError, Result};
pub use featurizer::TrackerFeaturizer;
pub use matrix::FeatureMatrix;
pub use state::{Domain, Interpreter, NoopInterpreter, Tracker, TurnFeatures};
