//! Scoring predicted class distributions against true labels.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default probability clamp for log-loss.
pub const DEFAULT_LOG_LOSS_EPS: f64 = 1e-15;

/// How far a probability row may sum away from 1.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// One probability row per example over an ordered list of class indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    classes: Vec<usize>,
    rows: Vec<Vec<f64>>,
}

impl Probabilities {
    /// Validate and wrap a probability table. Rows must have one entry per
    /// class, contain finite non-negative values and sum to 1.
    pub fn new(classes: Vec<usize>, rows: Vec<Vec<f64>>) -> Result<Self, MlError> {
        if classes.is_empty() {
            return Err(MlError::invalid_input("probabilities need at least one class"));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != classes.len() {
                return Err(MlError::invalid_input(format!(
                    "probability row {i} has {} entries for {} classes",
                    row.len(),
                    classes.len()
                )));
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(MlError::invalid_input(format!(
                    "probability row {i} holds a negative or non-finite value"
                )));
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                return Err(MlError::invalid_input(format!(
                    "probability row {i} sums to {sum}"
                )));
            }
        }
        Ok(Self { classes, rows })
    }

    /// Every row uniform over `classes`.
    pub fn uniform(classes: Vec<usize>, n_rows: usize) -> Result<Self, MlError> {
        let width = classes.len().max(1);
        let rows = vec![vec![1.0 / width as f64; classes.len()]; n_rows];
        Self::new(classes, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Column holding `class`, if the class is part of the ordering.
    pub fn column_of(&self, class: usize) -> Option<usize> {
        self.classes.iter().position(|&c| c == class)
    }

    /// Most probable class of a row; ties go to the earlier column.
    pub fn argmax(&self, index: usize) -> usize {
        let row = &self.rows[index];
        let mut best = 0;
        for (col, &p) in row.iter().enumerate().skip(1) {
            if p > row[best] {
                best = col;
            }
        }
        self.classes[best]
    }
}

/// Whether lower or higher scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Minimize,
    Maximize,
}

impl Direction {
    /// True when `candidate` is strictly better than `incumbent`.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }
}

/// A metric over (true labels, predicted distributions).
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn direction(&self) -> Direction;

    fn score(&self, y_true: &[usize], predicted: &Probabilities) -> Result<f64, MlError>;
}

/// Map each true label to its probability column, rejecting empty or
/// misaligned input and labels the model never predicts.
fn label_columns(y_true: &[usize], predicted: &Probabilities) -> Result<Vec<usize>, MlError> {
    if y_true.is_empty() {
        return Err(MlError::invalid_input("cannot score an empty subset"));
    }
    if y_true.len() != predicted.len() {
        return Err(MlError::invalid_input(format!(
            "{} labels but {} probability rows",
            y_true.len(),
            predicted.len()
        )));
    }
    y_true
        .iter()
        .map(|&label| {
            predicted
                .column_of(label)
                .ok_or(MlError::LabelMismatch { label })
        })
        .collect()
}

/// Multi-class log-loss with probabilities clamped to `[eps, 1 - eps]`.
///
/// `eps` must lie in the open interval (0, 0.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLoss {
    pub eps: f64,
}

impl Default for LogLoss {
    fn default() -> Self {
        Self {
            eps: DEFAULT_LOG_LOSS_EPS,
        }
    }
}

impl Scorer for LogLoss {
    fn name(&self) -> &str {
        "log_loss"
    }

    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn score(&self, y_true: &[usize], predicted: &Probabilities) -> Result<f64, MlError> {
        if !(self.eps > 0.0 && self.eps < 0.5) {
            return Err(MlError::invalid_input(format!(
                "log-loss eps must be in (0, 0.5), got {}",
                self.eps
            )));
        }
        let columns = label_columns(y_true, predicted)?;
        let total: f64 = columns
            .iter()
            .enumerate()
            .map(|(i, &col)| -predicted.row(i)[col].clamp(self.eps, 1.0 - self.eps).ln())
            .sum();
        Ok(total / y_true.len() as f64)
    }
}

/// Fraction of rows whose most probable class is the true one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy;

impl Scorer for Accuracy {
    fn name(&self) -> &str {
        "accuracy"
    }

    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    fn score(&self, y_true: &[usize], predicted: &Probabilities) -> Result<f64, MlError> {
        label_columns(y_true, predicted)?;
        let correct = y_true
            .iter()
            .enumerate()
            .filter(|(i, label)| predicted.argmax(*i) == **label)
            .count();
        Ok(correct as f64 / y_true.len() as f64)
    }
}

/// Mean squared distance between each row and the one-hot true label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrierScore;

impl Scorer for BrierScore {
    fn name(&self) -> &str {
        "brier"
    }

    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn score(&self, y_true: &[usize], predicted: &Probabilities) -> Result<f64, MlError> {
        let columns = label_columns(y_true, predicted)?;
        let total: f64 = columns
            .iter()
            .enumerate()
            .map(|(i, &truth)| {
                predicted
                    .row(i)
                    .iter()
                    .enumerate()
                    .map(|(col, &p)| {
                        let target = if col == truth { 1.0 } else { 0.0 };
                        (p - target).powi(2)
                    })
                    .sum::<f64>()
            })
            .sum();
        Ok(total / y_true.len() as f64)
    }
}

/// Built-in metrics selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    LogLoss,
    Accuracy,
    Brier,
}

impl MetricKind {
    pub fn scorer(self) -> Box<dyn Scorer> {
        match self {
            MetricKind::LogLoss => Box::new(LogLoss::default()),
            MetricKind::Accuracy => Box::new(Accuracy),
            MetricKind::Brier => Box::new(BrierScore),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::LogLoss => "log_loss",
            MetricKind::Accuracy => "accuracy",
            MetricKind::Brier => "brier",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "log_loss" | "logloss" => Ok(MetricKind::LogLoss),
            "accuracy" | "acc" => Ok(MetricKind::Accuracy),
            "brier" | "brier_score" => Ok(MetricKind::Brier),
            other => Err(MlError::invalid_input(format!("unknown metric '{other}'"))),
        }
    }
}
