use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid feature shape: {0}")]
    InvalidFeatureShape(String),
    #[error("Cannot fit a label codec on an empty label set")]
    EmptyLabelSet,
    #[error("Label {0} was not seen during training")]
    UnknownLabel(usize),
    #[error("Class code {0} is outside the fitted codec")]
    UnknownCode(usize),
    #[error("Policy has no trained model")]
    NotTrained,
    #[error("Cross-validation setup is invalid: {0}")]
    CrossValidation(String),
    #[error("Model path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("Loaded featurizer of kind '{found}', expected '{expected}'")]
    FeaturizerTypeMismatch { expected: String, found: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metadata (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model blob (de)serialization failed: {0}")]
    Blob(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
