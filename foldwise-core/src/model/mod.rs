//! Model capability interface and the built-in model families.
//!
//! The selector only ever talks to [`ModelFamily`] and [`FittedModel`]; it
//! never names a concrete algorithm.

pub mod knn;
pub mod logistic;

pub use knn::KNearestNeighbors;
pub use logistic::LogisticRegression;

use crate::data::Dataset;
use crate::error::MlError;
use crate::score::Probabilities;
use crate::select::{Candidate, ParamGrid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// A recoverable fit failure. The selector records it against the fold
/// instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct FitError {
    pub reason: String,
}

impl FitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Bounds applied to every fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Iteration budget; a fit that exhausts it reports `converged = false`.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// Convergence tolerance, interpreted by each family.
    #[serde(default = "default_tol")]
    pub tol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tol: default_tol(),
        }
    }
}

fn default_max_iter() -> usize {
    1000
}

fn default_tol() -> f64 {
    1e-4
}

/// Result of a successful fit.
pub struct FitOutcome {
    pub model: Box<dyn FittedModel>,
    pub converged: bool,
    pub iterations: usize,
}

impl fmt::Debug for FitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitOutcome")
            .field("classes", &self.model.classes())
            .field("converged", &self.converged)
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// A trained predictor.
pub trait FittedModel: Send + Sync {
    /// Class indices the model can predict, in probability-column order.
    fn classes(&self) -> &[usize];

    fn predict_proba(&self, data: &Dataset) -> Result<Probabilities, MlError>;
}

/// A model family parameterized by named hyperparameters.
pub trait ModelFamily: Send + Sync {
    fn name(&self) -> &str;

    /// Hyperparameter names `fit` understands.
    fn param_names(&self) -> &[&str];

    fn fit(
        &self,
        candidate: &Candidate,
        train: &Dataset,
        options: &FitOptions,
    ) -> Result<FitOutcome, FitError>;
}

/// Built-in families selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    LogisticRegression,
    KNearestNeighbors,
}

impl ModelKind {
    pub fn family(self) -> Arc<dyn ModelFamily> {
        match self {
            ModelKind::LogisticRegression => Arc::new(LogisticRegression),
            ModelKind::KNearestNeighbors => Arc::new(KNearestNeighbors),
        }
    }

    /// Grid used when configuration names none.
    pub fn default_grid(self) -> ParamGrid {
        match self {
            ModelKind::LogisticRegression => {
                ParamGrid::new().param(logistic::PARAM_C, [0.01, 0.1, 1.0, 10.0, 100.0])
            }
            ModelKind::KNearestNeighbors => {
                ParamGrid::new().param(knn::PARAM_NEIGHBORS, [1.0, 3.0, 5.0, 9.0, 15.0])
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::KNearestNeighbors => "k_nearest_neighbors",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "logistic_regression" | "logistic" | "logreg" => Ok(ModelKind::LogisticRegression),
            "k_nearest_neighbors" | "knn" => Ok(ModelKind::KNearestNeighbors),
            other => Err(MlError::invalid_input(format!("unknown model '{other}'"))),
        }
    }
}

/// Class indices present in a training set, and a lookup from class index
/// to its column in that ordering.
pub(crate) fn class_columns(train: &Dataset) -> (Vec<usize>, Vec<Option<usize>>) {
    let classes = train.present_classes();
    let mut lookup = vec![None; train.n_classes()];
    for (col, &class) in classes.iter().enumerate() {
        lookup[class] = Some(col);
    }
    (classes, lookup)
}

pub(crate) fn check_width(expected: usize, data: &Dataset) -> Result<(), MlError> {
    if data.n_features() != expected {
        return Err(MlError::invalid_input(format!(
            "model was fitted on {expected} features, got {}",
            data.n_features()
        )));
    }
    Ok(())
}
