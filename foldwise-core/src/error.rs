//! Error types for the foldwise-core crate.

use crate::model::FitError;
use thiserror::Error;

/// Top-level error type for splitting, scoring and selection.
///
/// Every variant except [`MlError::Fit`] is structural: it signals bad input
/// and aborts whatever run produced it. Recoverable fit problems are carried
/// as [`FitError`] and turned into fold diagnostics by the selector.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Invalid split ratio: {0}")]
    InvalidSplitRatio(String),

    #[error("Invalid fold count: {requested} requested for {n_samples} samples")]
    InvalidFoldCount { requested: usize, n_samples: usize },

    #[error("Insufficient class count: class '{class}' has {count} members, {required} required")]
    InsufficientClassCount {
        class: String,
        count: usize,
        required: usize,
    },

    #[error("Label mismatch: class {label} is absent from the predicted class ordering")]
    LabelMismatch { label: usize },

    #[error("No feasible candidate: {0}")]
    NoFeasibleCandidate(String),

    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MlError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn no_feasible_candidate(msg: impl Into<String>) -> Self {
        Self::NoFeasibleCandidate(msg.into())
    }

    pub fn split_ratio(msg: impl Into<String>) -> Self {
        Self::InvalidSplitRatio(msg.into())
    }
}
