//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use foldwise_core::{
    Candidate, Dataset, FitError, FitOptions, FitOutcome, FittedModel, MlError, ModelFamily,
    Probabilities,
};

/// Two classes; feature 0 is the label, feature 1 is the row id.
pub fn labeled_ids(n_per_class: usize) -> Dataset {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n_per_class * 2 {
        let label = i % 2;
        rows.push(vec![label as f64, i as f64]);
        labels.push(label);
    }
    Dataset::new(vec!["zero".into(), "one".into()], rows, labels).unwrap()
}

/// Gaussian-free blobs: `n_per_class` rows around one centre per class.
pub fn blobs(n_per_class: usize, n_classes: usize) -> Dataset {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n_per_class {
        let jitter = ((i * 7) % 11) as f64 / 11.0 - 0.5;
        for class in 0..n_classes {
            let angle = class as f64 * std::f64::consts::TAU / n_classes as f64;
            rows.push(vec![
                3.0 * angle.cos() + jitter,
                3.0 * angle.sin() - jitter * 0.5,
            ]);
            labels.push(class);
        }
    }
    let classes = (0..n_classes).map(|c| format!("class{c}")).collect();
    Dataset::new(classes, rows, labels).unwrap()
}

/// A model family whose confidence in the true label is `c / (c + 1)`, so
/// log-loss strictly decreases as `c` grows. It reads the label from
/// feature 0 and can be told to fail or stop short of convergence.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceFamily {
    /// Fail any fit whose training rows lack this row id.
    pub fail_without_row: Option<f64>,
    /// Report non-convergence for `c` above this value.
    pub slow_above: Option<f64>,
    /// Apply the two rules above only to fits on more than this many rows.
    pub rules_above_rows: Option<usize>,
}

impl ModelFamily for ConfidenceFamily {
    fn name(&self) -> &str {
        "confidence"
    }

    fn param_names(&self) -> &[&str] {
        &["c"]
    }

    fn fit(
        &self,
        candidate: &Candidate,
        train: &Dataset,
        options: &FitOptions,
    ) -> Result<FitOutcome, FitError> {
        let c = candidate.get("c").unwrap_or(1.0);
        if c <= 0.0 {
            return Err(FitError::new(format!("c must be positive, got {c}")));
        }
        let rules_apply = self.rules_above_rows.is_none_or(|rows| train.len() > rows);
        if let Some(id) = self.fail_without_row.filter(|_| rules_apply) {
            if !train.rows().any(|row| row[1] == id) {
                return Err(FitError::new(format!("row {id} is not in the training set")));
            }
        }
        let converged = !(rules_apply && self.slow_above.is_some_and(|limit| c > limit));
        Ok(FitOutcome {
            model: Box::new(ConfidenceModel {
                classes: train.present_classes(),
                p_true: c / (c + 1.0),
            }),
            converged,
            iterations: if converged { 3 } else { options.max_iter },
        })
    }
}

struct ConfidenceModel {
    classes: Vec<usize>,
    p_true: f64,
}

impl FittedModel for ConfidenceModel {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, data: &Dataset) -> Result<Probabilities, MlError> {
        let width = self.classes.len();
        let rows = data
            .rows()
            .map(|row| {
                let label = row[0] as usize;
                if width == 1 || !self.classes.contains(&label) {
                    return vec![1.0 / width as f64; width];
                }
                let rest = (1.0 - self.p_true) / (width - 1) as f64;
                self.classes
                    .iter()
                    .map(|&class| if class == label { self.p_true } else { rest })
                    .collect()
            })
            .collect();
        Probabilities::new(self.classes.clone(), rows)
    }
}
